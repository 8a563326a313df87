use dicomtree_core::{
    DicomRecord, DicomTags, DirEntry, FileEntry, ScanConfig, ScanError, ScanWarning, WarningKind,
    normalize_path,
};
use std::time::{Duration, SystemTime};

#[test]
fn test_normalize_path_windows_style() {
    assert_eq!(normalize_path("D:\\studies\\\\ct\\"), "D:/studies/ct");
    assert_eq!(normalize_path("  /data/mr/  "), "/data/mr");
}

#[test]
fn test_file_entry_serialization_uses_type_field() {
    let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let entry = FileEntry::new("/data/scans/IM0001.DCM", 4096, modified);

    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["type"], ".dcm");
    assert_eq!(json["name"], "IM0001.DCM");
    assert_eq!(json["path"], "/data/scans/IM0001.DCM");
    assert_eq!(json["size"], 4096);

    let back: FileEntry = serde_json::from_value(json).unwrap();
    assert_eq!(back, entry);
}

#[test]
fn test_dir_entry_keeps_canonical_path() {
    let entry = DirEntry::from_path("/data//scans/./ct/");
    assert_eq!(entry.path, "/data/scans/ct");
    assert_eq!(entry.name.as_str(), "ct");
}

#[test]
fn test_record_json_uses_dicom_keywords() {
    let tags = DicomTags {
        patient_name: Some("Doe^Jane".into()),
        patient_id: Some("P-1".into()),
        study_instance_uid: Some("1.2.3".into()),
        series_number: Some(4),
        instance_number: Some(12),
        ..Default::default()
    };
    let record = DicomRecord::new("IM12", "/data/IM12", tags);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["mimeType"], "application/dicom");
    assert_eq!(json["isVolume"], false);
    assert_eq!(json["tags"]["PatientName"], "Doe^Jane");
    assert_eq!(json["tags"]["PatientID"], "P-1");
    assert_eq!(json["tags"]["StudyInstanceUID"], "1.2.3");
    assert_eq!(json["tags"]["SeriesNumber"], 4);
    assert_eq!(json["tags"]["InstanceNumber"], 12);
    assert!(json["tags"]["SOPInstanceUID"].is_null());
}

#[test]
fn test_config_serde_defaults() {
    let config: ScanConfig = serde_json::from_str(r#"{"roots": ["/data"]}"#).unwrap();
    assert!(!config.deep);
    assert_eq!(config.channel_capacity, 64);
    assert_eq!(config.threads, 0);
}

#[test]
fn test_error_and_warning_types() {
    let err = ScanError::Other {
        message: "scan already finished".to_string(),
    };
    assert_eq!(err.to_string(), "scan already finished");

    let warning = ScanWarning::read_error(
        "/data",
        &std::io::Error::new(std::io::ErrorKind::Other, "boom"),
    );
    assert_eq!(warning.kind, WarningKind::ReadError);
    assert!(warning.message.contains("boom"));
}
