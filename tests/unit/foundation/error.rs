use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(AssetError::decode("x").to_string().contains("decode error:"));
    assert!(AssetError::io("x").to_string().contains("io error:"));
    assert!(AssetError::device("x").to_string().contains("device error:"));
    assert!(AssetError::config("x").to_string().contains("config error:"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = AssetError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
