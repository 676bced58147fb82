use super::*;

fn leaf(kind: FourCc, payload: &[u8]) -> Vec<u8> {
    let mut b = BoxWriter::new(kind);
    b.child(payload.to_vec());
    b.finish().unwrap()
}

#[test]
fn writer_patches_size_and_type() {
    let bytes = leaf(FourCc::MDAT, b"abc");
    assert_eq!(bytes.len(), 11);
    assert_eq!(&bytes[..4], &11u32.to_be_bytes());
    assert_eq!(&bytes[4..8], b"mdat");
    assert_eq!(&bytes[8..], b"abc");
}

#[test]
fn full_box_header_round_trips() {
    let mut b = BoxWriter::full(FourCc::PITM, 1, 0x0A_0B0C);
    b.u32(7);
    let bytes = b.finish().unwrap();

    let (kind, payload, offset) = boxes(&bytes, 100).next().unwrap().unwrap();
    assert_eq!(kind, FourCc::PITM);
    assert_eq!(offset, 108);
    let mut r = ByteReader::new(payload);
    assert_eq!(r.full_header().unwrap(), (1, 0x0A_0B0C));
    assert_eq!(r.u32().unwrap(), 7);
    assert_eq!(r.remaining(), 0);
}

#[test]
fn boxes_walks_siblings_with_absolute_offsets() {
    let mut data = leaf(FourCc::FTYP, b"mif1");
    data.extend(leaf(FourCc::MDAT, b"xyz!"));

    let found: Vec<_> = boxes(&data, 0).map(|b| b.unwrap()).collect();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].0, FourCc::FTYP);
    assert_eq!(found[0].1, b"mif1");
    assert_eq!(found[0].2, 8);
    assert_eq!(found[1].0, FourCc::MDAT);
    assert_eq!(found[1].2, 20);
    assert_eq!(&data[found[1].2..found[1].2 + 4], b"xyz!");
}

#[test]
fn size_zero_box_extends_to_end() {
    let mut data = vec![0, 0, 0, 0];
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(b"tail bytes");

    let (kind, payload, _) = boxes(&data, 0).next().unwrap().unwrap();
    assert_eq!(kind, FourCc::MDAT);
    assert_eq!(payload, b"tail bytes");
}

#[test]
fn largesize_box_is_read() {
    let mut data = 1u32.to_be_bytes().to_vec();
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&(16u64 + 2).to_be_bytes());
    data.extend_from_slice(b"ok");

    let (kind, payload, offset) = boxes(&data, 0).next().unwrap().unwrap();
    assert_eq!(kind, FourCc::MDAT);
    assert_eq!(payload, b"ok");
    assert_eq!(offset, 16);
}

#[test]
fn oversized_box_is_an_error_and_stops_iteration() {
    let mut data = 64u32.to_be_bytes().to_vec();
    data.extend_from_slice(b"meta");
    data.extend_from_slice(&[0; 8]);

    let mut it = boxes(&data, 0);
    let err = it.next().unwrap().unwrap_err();
    assert!(matches!(err, ImageError::InvalidImageFormat(_)));
    assert!(it.next().is_none());
}

#[test]
fn truncated_header_is_an_error() {
    let data = [0u8, 0, 0];
    let err = boxes(&data, 0).next().unwrap().unwrap_err();
    assert!(err.to_string().contains("truncated"));
}

#[test]
fn reader_handles_field_sizes_and_strings() {
    let mut b = BoxWriter::new(FourCc::INFE);
    b.u32(0xDEAD_BEEF).cstr("name").u8(9);
    let bytes = b.finish().unwrap();
    let mut r = ByteReader::new(&bytes[8..]);

    assert_eq!(r.uint(0).unwrap(), 0);
    assert_eq!(r.uint(4).unwrap(), 0xDEAD_BEEF);
    assert_eq!(r.cstr().unwrap(), "name");
    assert_eq!(r.u8().unwrap(), 9);
    assert!(r.u8().is_err());
    assert!(ByteReader::new(&[0; 2]).uint(2).is_err());
}

#[test]
fn unterminated_string_consumes_rest() {
    let mut r = ByteReader::new(b"abc");
    assert_eq!(r.cstr().unwrap(), "abc");
    assert_eq!(r.remaining(), 0);
}

#[test]
fn fourcc_formats_as_text() {
    assert_eq!(FourCc::URI.to_string(), "uri ");
    assert_eq!(format!("{:?}", FourCc::JPEG), "FourCc(jpeg)");
    assert!(FourCc::MIME.is_metadata_item());
    assert!(!FourCc::JPEG.is_metadata_item());
}

#[test]
fn huge_largesize_after_first_box_is_an_error() {
    let mut data = leaf(FourCc::FTYP, b"");
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(b"mdat");
    data.extend_from_slice(&u64::MAX.to_be_bytes());

    let mut it = boxes(&data, 0);
    assert_eq!(it.next().unwrap().unwrap().0, FourCc::FTYP);
    let err = it.next().unwrap().unwrap_err();
    assert!(matches!(err, ImageError::InvalidImageFormat(_)));
    assert!(it.next().is_none());
}
