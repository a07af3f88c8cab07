use std::path::PathBuf;

use dbd_core::{
    catalog::{Catalog, CatalogState},
    sources::{ADDONS, KILLER_PERKS, POWERS, SURVIVOR_PERKS, read_segment},
};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture_catalog() -> CatalogState {
    let dir = fixtures_dir();

    Catalog::from_segments(
        read_segment(&dir, SURVIVOR_PERKS).unwrap(),
        read_segment(&dir, KILLER_PERKS).unwrap(),
        read_segment(&dir, ADDONS).unwrap(),
        read_segment(&dir, POWERS).unwrap(),
    )
    .unwrap()
    .into()
}
