use std::fs::File;
use std::io::{Read, Write};

use dcmtree_core::header::Length;
use dcmtree_object::{open_file, FileDicomObject, OpenFileOptions, ReadError, Tag, VR};

const REFERENCED_SERIES: Tag = Tag(0x0008, 0x1115);
const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);

/// Build an MR object with a two-item sequence and a small pixel data element.
fn sample_object() -> FileDicomObject {
    let mut obj = FileDicomObject::new_empty();
    obj.append_element(
        None,
        Tag::MEDIA_STORAGE_SOP_CLASS_UID,
        VR::UI,
        "1.2.840.10008.5.1.4.1.1.4",
    )
    .unwrap();
    obj.append_element(None, Tag(0x0008, 0x0020), VR::DA, "20240131")
        .unwrap();
    let seq = obj.append_sequence(None, REFERENCED_SERIES).unwrap();
    for name in ["DOE^JOHN", "DOE^JANE"] {
        let item = obj.append_item(seq).unwrap();
        obj.append_element(Some(item), PATIENT_NAME, VR::PN, name)
            .unwrap();
    }
    obj.append_element(None, Tag(0x0028, 0x0010), VR::US, 2_u16.to_le_bytes())
        .unwrap();
    obj.append_element(None, Tag(0x0028, 0x0030), VR::DS, "0.5\\0.5")
        .unwrap();
    obj.append_element(None, Tag::PIXEL_DATA, VR::OW, vec![0xAB_u8; 8])
        .unwrap();
    obj
}

#[test]
fn write_then_open_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.dcm");

    let obj = sample_object();
    obj.write_to_file(&path).unwrap();

    let read = open_file(&path).unwrap();
    assert_eq!(read, obj);
    assert_eq!(read.sop_class_name(), Some("MR Image Storage"));

    let items: Vec<_> = read
        .find_tag(REFERENCED_SERIES)
        .unwrap()
        .children()
        .collect();
    assert_eq!(items.len(), 2);
    let names: Vec<_> = items
        .iter()
        .map(|item| item.children().next().unwrap().to_string_lossy())
        .collect();
    assert_eq!(names, vec!["DOE^JOHN", "DOE^JANE"]);

    assert_eq!(read.find_tag(Tag(0x0028, 0x0010)).unwrap().to_int().unwrap(), 2);
    assert_eq!(read.find_tag(Tag(0x0028, 0x0030)).unwrap().to_real().unwrap(), 0.5);
    assert_eq!(
        read.find_tag(Tag(0x0008, 0x0020)).unwrap().to_iso_string().as_deref(),
        Some("2024-01-31")
    );
}

#[test]
fn open_file_header_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("header_only.dcm");
    sample_object().write_to_file(&path).unwrap();

    let obj = OpenFileOptions::new()
        .header_only(true)
        .open_file(&path)
        .unwrap();
    let pixels = obj.find_tag(Tag::PIXEL_DATA).unwrap();
    assert_eq!(pixels.length(), Length(8));
    assert_eq!(pixels.value(), None);
    // other elements are still read in full
    assert_eq!(
        obj.find_tag(PATIENT_NAME).unwrap().to_string_lossy(),
        "DOE^JOHN"
    );
}

#[test]
fn written_item_lengths_are_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.dcm");
    sample_object().write_to_file(&path).unwrap();

    let mut data = Vec::new();
    File::open(&path)
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();

    // every item header is followed by a 16-byte PN element
    let item_start = [0xFE, 0xFF, 0x00, 0xE0, 0x10, 0x00, 0x00, 0x00];
    let count = data.windows(8).filter(|w| *w == item_start).count();
    assert_eq!(count, 2);

    let read = open_file(&path).unwrap();
    for item in read.find_tag(REFERENCED_SERIES).unwrap().children() {
        assert_eq!(item.length(), Length(16));
    }
}

#[test]
fn nesting_limit_when_opening() {
    let mut obj = FileDicomObject::new_empty();
    let outer = obj.append_sequence(None, REFERENCED_SERIES).unwrap();
    let item = obj.append_item(outer).unwrap();
    let inner = obj.append_sequence(Some(item), Tag(0x0008, 0x1140)).unwrap();
    let inner_item = obj.append_item(inner).unwrap();
    obj.append_element(Some(inner_item), Tag(0x0008, 0x1155), VR::UI, "1.2.3")
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested.dcm");
    obj.write_to_file(&path).unwrap();

    assert!(open_file(&path).is_ok());
    let err = OpenFileOptions::new()
        .max_depth(1)
        .open_file(&path)
        .unwrap_err();
    assert!(matches!(err, ReadError::ParseDataSet { .. }), "got {:?}", err);
}

#[test]
fn open_missing_and_foreign_files() {
    let dir = tempfile::tempdir().unwrap();

    let err = open_file(dir.path().join("does_not_exist.dcm")).unwrap_err();
    assert!(matches!(err, ReadError::OpenFile { .. }), "got {:?}", err);

    let path = dir.path().join("plain.txt");
    File::create(&path)
        .unwrap()
        .write_all(b"this is not a DICOM file")
        .unwrap();
    let err = open_file(&path).unwrap_err();
    assert!(matches!(err, ReadError::NotDicom { .. }), "got {:?}", err);
}

#[test]
fn truncated_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truncated.dcm");

    let mut data = Vec::new();
    sample_object().write_all(&mut data).unwrap();
    // cut the pixel data value short
    data.truncate(data.len() - 3);
    File::create(&path).unwrap().write_all(&data).unwrap();

    let err = open_file(&path).unwrap_err();
    assert!(matches!(err, ReadError::ParseDataSet { .. }), "got {:?}", err);
}
