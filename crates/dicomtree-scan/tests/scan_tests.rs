use std::fs;
use std::path::Path;
use std::time::Duration;

use dicom::core::{DataElement, PrimitiveValue, VR, dicom_value};
use dicom::dictionary_std::tags;
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use tempfile::TempDir;

use dicomtree_scan::{
    DicomScanner, Exclusion, FrameDecoder, FrameEncoder, ScanConfig, SniffOutcome, sniff,
};

const CT_IMAGE: &str = "1.2.840.10008.5.1.4.1.1.2";

struct Fixture<'a> {
    study: &'a str,
    series: &'a str,
    instance: &'a str,
    instance_number: i32,
    pixels: bool,
}

impl<'a> Fixture<'a> {
    fn image(instance: &'a str, instance_number: i32) -> Self {
        Self {
            study: "1.2.3",
            series: "1.2.3.4",
            instance,
            instance_number,
            pixels: true,
        }
    }

    fn header_only(instance: &'a str) -> Self {
        Self {
            pixels: false,
            ..Self::image(instance, 1)
        }
    }
}

fn write_dicom(path: &Path, fixture: &Fixture<'_>) {
    let mut obj = InMemDicomObject::new_empty();
    obj.put(DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(CT_IMAGE)));
    obj.put(DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from(fixture.instance)));
    obj.put(DataElement::new(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from("Doe^Jane")));
    obj.put(DataElement::new(tags::PATIENT_ID, VR::LO, PrimitiveValue::from("P1")));
    obj.put(DataElement::new(tags::STUDY_INSTANCE_UID, VR::UI, PrimitiveValue::from(fixture.study)));
    obj.put(DataElement::new(tags::SERIES_INSTANCE_UID, VR::UI, PrimitiveValue::from(fixture.series)));
    obj.put(DataElement::new(
        tags::INSTANCE_NUMBER,
        VR::IS,
        PrimitiveValue::from(fixture.instance_number.to_string()),
    ));
    if fixture.pixels {
        obj.put(DataElement::new(tags::ROWS, VR::US, dicom_value!(U16, [2])));
        obj.put(DataElement::new(tags::COLUMNS, VR::US, dicom_value!(U16, [2])));
        obj.put(DataElement::new(tags::BITS_ALLOCATED, VR::US, dicom_value!(U16, [8])));
        obj.put(DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::U8(vec![0u8; 4].into())));
    }

    let file = obj
        .with_meta(
            FileMetaTableBuilder::new()
                .transfer_syntax("1.2.840.10008.1.2.1")
                .media_storage_sop_class_uid(CT_IMAGE)
                .media_storage_sop_instance_uid(fixture.instance),
        )
        .unwrap();
    file.write_to_file(path).unwrap();
}

fn data_dir() -> TempDir {
    tempfile::Builder::new().prefix("scan").tempdir().unwrap()
}

fn scan_config(root: &Path) -> ScanConfig {
    ScanConfig::new([root])
}

#[tokio::test(flavor = "multi_thread")]
async fn test_only_images_with_pixels_are_streamed() {
    let temp = data_dir();
    let root = temp.path();
    write_dicom(&root.join("a.dcm"), &Fixture::image("1.2.3.4.1", 1));
    write_dicom(&root.join("b.dcm"), &Fixture::header_only("1.2.3.4.2"));
    fs::write(root.join("notes.txt"), "not an image").unwrap();

    let scanner = DicomScanner::new();
    let (records, progress) = scanner.scan(scan_config(root)).unwrap().collect_all().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "a.dcm");
    assert!(records[0].path.ends_with("/a.dcm"));
    assert_eq!(records[0].mime_type, "application/dicom");
    assert_eq!(records[0].tags.sop_instance_uid.as_deref(), Some("1.2.3.4.1"));

    assert_eq!(progress.files_visited, 3);
    assert_eq!(progress.records_emitted, 1);
    assert_eq!(progress.files_excluded, 2);
    assert_eq!(progress.files_failed, 0);
    assert!(!progress.cancelled);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_corrupt_file_does_not_abort_scan() {
    let temp = data_dir();
    let root = temp.path();
    fs::write(root.join("broken.dcm"), b"definitely not dicom").unwrap();
    fs::create_dir(root.join("series")).unwrap();
    write_dicom(&root.join("series/IM0001"), &Fixture::image("1.2.3.4.1", 1));

    let scanner = DicomScanner::new();
    let (records, progress) = scanner.scan(scan_config(root)).unwrap().collect_all().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "IM0001");
    assert_eq!(progress.files_failed, 1);
    assert_eq!(progress.warnings.len(), 1);
    assert!(progress.warnings[0].path.ends_with("broken.dcm"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_records_follow_discovery_order() {
    let temp = data_dir();
    let root = temp.path();
    fs::create_dir_all(root.join("b")).unwrap();
    fs::create_dir_all(root.join("a/deeper")).unwrap();
    write_dicom(&root.join("z.dcm"), &Fixture::image("1.0", 1));
    write_dicom(&root.join("a/deeper/x.dcm"), &Fixture::image("1.2", 2));
    write_dicom(&root.join("a/y.dcm"), &Fixture::image("1.1", 3));
    write_dicom(&root.join("b/w.dcm"), &Fixture::image("1.3", 4));

    let scanner = DicomScanner::new();
    let (records, _) = scanner.scan(scan_config(root)).unwrap().collect_all().await.unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["z.dcm", "y.dcm", "x.dcm", "w.dcm"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_hidden_and_shortcut_entries_are_ignored() {
    let temp = data_dir();
    let root = temp.path();
    fs::create_dir(root.join(".cache")).unwrap();
    write_dicom(&root.join(".cache/hidden.dcm"), &Fixture::image("1.9", 1));
    write_dicom(&root.join(".dotfile"), &Fixture::image("1.8", 1));
    fs::write(root.join("study.lnk"), b"shortcut").unwrap();
    write_dicom(&root.join("visible.dcm"), &Fixture::image("1.7", 1));

    let scanner = DicomScanner::new();
    let (records, progress) = scanner.scan(scan_config(root)).unwrap().collect_all().await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "visible.dcm");
    assert_eq!(progress.files_visited, 1);
}

#[cfg(unix)]
#[tokio::test(flavor = "multi_thread")]
async fn test_symlinks_are_not_followed() {
    let temp = data_dir();
    let outside = data_dir();
    write_dicom(&outside.path().join("elsewhere.dcm"), &Fixture::image("1.6", 1));
    write_dicom(&temp.path().join("real.dcm"), &Fixture::image("1.5", 1));
    std::os::unix::fs::symlink(outside.path(), temp.path().join("linked_dir")).unwrap();
    std::os::unix::fs::symlink(
        temp.path().join("real.dcm"),
        temp.path().join("linked.dcm"),
    )
    .unwrap();

    let scanner = DicomScanner::new();
    let (records, _) = scanner
        .scan(scan_config(temp.path()))
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["real.dcm"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_roots_are_skipped() {
    let temp = data_dir();
    write_dicom(&temp.path().join("a.dcm"), &Fixture::image("1.2", 1));

    let config = ScanConfig::new([temp.path().join("missing"), temp.path().to_path_buf()]);
    let scanner = DicomScanner::new();
    let (records, _) = scanner.scan(config).unwrap().collect_all().await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancellation_stops_producer() {
    let temp = data_dir();
    for n in 0..40 {
        write_dicom(
            &temp.path().join(format!("IM{n:04}.dcm")),
            &Fixture::image(&format!("1.2.3.4.{n}"), n),
        );
    }

    let config = ScanConfig::builder()
        .roots(vec![temp.path().to_path_buf()])
        .channel_capacity(1usize)
        .build()
        .unwrap();

    let scanner = DicomScanner::new();
    let mut stream = scanner.scan(config).unwrap();
    let mut received = Vec::new();
    for _ in 0..3 {
        received.push(stream.recv().await.unwrap());
    }
    stream.cancel();

    // At most the buffered record remains after cancelling.
    let mut leftover = 0;
    while stream.recv().await.is_some() {
        leftover += 1;
    }
    assert!(leftover <= 1);

    let progress = tokio::time::timeout(Duration::from_secs(5), stream.finish())
        .await
        .expect("producer did not stop in time")
        .unwrap();
    assert!(progress.cancelled);
    assert!(progress.records_emitted < 40);
    assert_eq!(received[0].name, "IM0000.dcm");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dropping_stream_stops_producer() {
    let temp = data_dir();
    for n in 0..40 {
        write_dicom(
            &temp.path().join(format!("IM{n:04}.dcm")),
            &Fixture::image(&format!("1.2.3.4.{n}"), n),
        );
    }

    let config = ScanConfig::builder()
        .roots(vec![temp.path().to_path_buf()])
        .channel_capacity(1usize)
        .build()
        .unwrap();

    let scanner = DicomScanner::new();
    let mut progress_rx = scanner.subscribe();
    let mut stream = scanner.scan(config).unwrap();
    assert!(stream.recv().await.is_some());
    drop(stream);

    let last = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let update = progress_rx.recv().await.expect("progress channel open");
            if update.cancelled {
                return update;
            }
        }
    })
    .await
    .expect("producer did not stop in time");
    assert!(last.records_emitted < 40);
    assert!(last.files_visited < 40);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cancel_stops_walk_through_empty_folders() {
    const EMPTY: usize = 5000;

    let temp = data_dir();
    write_dicom(&temp.path().join("a.dcm"), &Fixture::image("1.2.1", 1));
    for n in 0..EMPTY {
        fs::create_dir(temp.path().join(format!("empty{n:05}"))).unwrap();
    }
    fs::create_dir(temp.path().join("last")).unwrap();
    write_dicom(&temp.path().join("last/z.dcm"), &Fixture::image("1.2.2", 2));

    let scanner = DicomScanner::new();
    let mut stream = scanner.scan(scan_config(temp.path())).unwrap();
    assert_eq!(stream.recv().await.unwrap().name, "a.dcm");
    stream.cancel();
    assert!(stream.recv().await.is_none());

    let progress = tokio::time::timeout(Duration::from_secs(5), stream.finish())
        .await
        .expect("producer did not stop in time")
        .unwrap();
    assert!(progress.cancelled);
    assert_eq!(progress.records_emitted, 1);
    // root + every empty folder + `last`
    assert!(progress.dirs_visited < EMPTY as u64 + 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_roots_are_walked_in_input_order() {
    let temp = data_dir();
    fs::create_dir(temp.path().join("series")).unwrap();
    write_dicom(&temp.path().join("series/IM1"), &Fixture::image("1.2.1", 1));
    write_dicom(&temp.path().join("loose.dcm"), &Fixture::image("1.2.2", 2));

    let config = ScanConfig::new([temp.path().join("series"), temp.path().join("loose.dcm")]);
    let scanner = DicomScanner::new();
    let (records, _) = scanner.scan(config).unwrap().collect_all().await.unwrap();

    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["IM1", "loose.dcm"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_progress_is_published() {
    let temp = data_dir();
    write_dicom(&temp.path().join("a.dcm"), &Fixture::image("1.2", 1));

    let scanner = DicomScanner::new();
    let mut progress_rx = scanner.subscribe();
    let (_, progress) = scanner
        .scan(scan_config(temp.path()))
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let mut last = None;
    while let Ok(update) = progress_rx.try_recv() {
        last = Some(update);
    }
    let last = last.expect("final progress snapshot");
    assert_eq!(last.files_visited, progress.files_visited);
    assert_eq!(last.records_emitted, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_streamed_records_survive_framing() {
    let temp = data_dir();
    write_dicom(&temp.path().join("a.dcm"), &Fixture::image("1.2.1", 1));
    write_dicom(&temp.path().join("b.dcm"), &Fixture::image("1.2.2", 2));

    let scanner = DicomScanner::new();
    let (records, _) = scanner
        .scan(scan_config(temp.path()))
        .unwrap()
        .collect_all()
        .await
        .unwrap();

    let mut encoder = FrameEncoder::new(Vec::new());
    for record in &records {
        encoder.write(record).unwrap();
    }
    let bytes = encoder.into_inner();

    let mut decoder = FrameDecoder::new();
    let mut decoded = Vec::new();
    for chunk in bytes.chunks(7) {
        decoded.extend(decoder.decode(chunk).unwrap());
    }
    assert_eq!(decoded, records);
}

#[test]
fn test_sniff_paths_directly() {
    let temp = data_dir();
    let image = temp.path().join("IMAGE.DICOM");
    let header = temp.path().join("header.dcm");
    write_dicom(&image, &Fixture::image("1.2.5", 5));
    write_dicom(&header, &Fixture::header_only("1.2.6"));

    let record = sniff(&image).into_record().unwrap();
    assert_eq!(record.tags.instance_number, Some(5));
    assert_eq!(record.tags.patient_name.as_deref(), Some("Doe^Jane"));
    assert_eq!(sniff(&header), SniffOutcome::Excluded(Exclusion::NoPixelData));
}
