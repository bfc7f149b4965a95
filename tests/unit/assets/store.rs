use super::*;

static A: &[u8] = b"first asset bytes";
static B: &[u8] = b"second asset bytes";

fn pending_image(bytes: &'static [u8]) -> ImageRecord {
    let src = SourceBytes::from(bytes);
    ImageRecord::pending(DedupKey::for_bytes(&src), ImageKind::Encoded, src)
}

#[test]
fn records_start_unloaded_with_one_reference() {
    let rec = pending_image(A);
    assert!(!rec.loaded());
    assert!(!rec.failed());
    assert_eq!(rec.references(), 1);
    assert_eq!(rec.texture(), None);
    assert_eq!(rec.info().width, 0);
}

#[test]
fn find_matches_address_identity_only_for_live_records() {
    let mut store = CacheStore::new(4, 1);
    let a = store.insert_image(pending_image(A));
    let _b = store.insert_image(pending_image(B));

    let key_a = DedupKey::Address(A.as_ptr() as usize);
    assert_eq!(store.find_image(key_a), Some(a));

    store.image_mut(a).unwrap().references = 0;
    assert_eq!(store.find_image(key_a), None);
    assert_eq!(store.image_count(), 2);
}

#[test]
fn fonts_are_keyed_by_identity_and_size() {
    let mut store = CacheStore::new(1, 4);
    let key = DedupKey::PathHash(42);
    let f16 = store.insert_font(FontRecord::pending(key, 16, SourceBytes::from(A)));
    let f24 = store.insert_font(FontRecord::pending(key, 24, SourceBytes::from(A)));

    assert_ne!(f16, f24);
    assert_eq!(store.find_font(key, 16), Some(f16));
    assert_eq!(store.find_font(key, 24), Some(f24));
    assert_eq!(store.find_font(key, 32), None);
}

#[test]
fn slots_never_move_after_insert() {
    let mut store = CacheStore::new(8, 1);
    let first = store.insert_image(pending_image(A));
    let addr = store.image(first).unwrap() as *const ImageRecord;
    for _ in 0..7 {
        store.insert_image(pending_image(B));
    }
    assert_eq!(store.image(first).unwrap() as *const ImageRecord, addr);
}

#[test]
#[should_panic(expected = "asset store exhausted")]
fn inserting_past_capacity_is_fatal() {
    let mut store = CacheStore::new(1, 1);
    store.insert_image(pending_image(A));
    store.insert_image(pending_image(B));
}

#[test]
fn clear_invalidates_outstanding_handles() {
    let mut store = CacheStore::new(2, 1);
    let h = store.insert_image(pending_image(A));
    store.clear();
    assert!(store.image(h).is_none());

    let h2 = store.insert_image(pending_image(A));
    assert_ne!(h, h2);
    assert!(store.image(h).is_none());
    assert!(store.image(h2).is_some());
}

#[test]
fn handles_from_another_store_do_not_resolve() {
    let mut one = CacheStore::new(1, 1);
    let mut two = CacheStore::new(1, 1);
    let h = one.insert_image(pending_image(A));
    two.insert_image(pending_image(A));
    assert!(two.image(h).is_none());
}

#[test]
fn scale_helpers_keep_aspect_ratio() {
    let mut rec = pending_image(A);
    rec.set_decoded(DecodedImage {
        width: 40,
        height: 20,
        channels: 4,
        order: PixelOrder::Rgba,
        pixels: vec![0; 40 * 20 * 4],
    });
    let info = rec.info();
    assert_eq!(info.scale_to_width(80), (80.0, 40.0));
    assert_eq!(info.scale_to_height(10), (20.0, 10.0));

    assert_eq!(pending_image(B).info().scale_to_width(10), (0.0, 0.0));
}

#[test]
fn release_payload_drops_source_and_pixels() {
    let mut rec = pending_image(A);
    rec.set_decoded(DecodedImage {
        width: 1,
        height: 1,
        channels: 4,
        order: PixelOrder::Rgba,
        pixels: vec![0; 4],
    });
    rec.release_payload();
    assert!(rec.source().is_none());
    assert!(rec.decoded().is_none());
}
