use std::fs;

use storage_content::ContentFactory;
use storage_core::{ItemHandle, Overlay, ResourceSelector};
use tempfile::TempDir;

fn write_content(dir: &TempDir) {
    fs::write(dir.path().join("config.toml"), "max_slots = 16\n").unwrap();
    fs::write(
        dir.path().join("items.ron"),
        r#"(resources: [
            (identifier: "coal"),
            (identifier: "iron_ingot"),
        ])"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("fluids.ron"),
        r#"(resources: [(identifier: "lava")])"#,
    )
    .unwrap();
    fs::create_dir(dir.path().join("machines")).unwrap();
    fs::write(
        dir.path().join("machines").join("furnace.ron"),
        r#"(
            items: [
                (transfer: input, filter: Resources(["coal"])),
                (transfer: output),
            ],
            fluids: [(capacity: Some(324000), transfer: input)],
            energy: Some((capacity: 16000, max_input: 400)),
        )"#,
    )
    .unwrap();
}

#[test]
fn test_build_machine_from_data_dir() {
    let dir = TempDir::new().unwrap();
    write_content(&dir);

    let factory = ContentFactory::new(dir.path());
    let furnace = factory.build_machine("furnace").expect("furnace should build");

    assert_eq!(furnace.items().size(), 2);
    assert_eq!(furnace.fluids().slot(0).capacity(), 324_000);
    assert_eq!(furnace.energy().external_insertion_rate(), 400);

    let coal = ItemHandle(0);
    let ingot = ItemHandle(1);
    assert!(furnace.items().slot(0).can_insert_external(coal, &Overlay::EMPTY));
    assert!(!furnace.items().slot(0).can_insert_external(ingot, &Overlay::EMPTY));

    furnace.items().slot(1).insert(ingot, &Overlay::EMPTY, 3);
    assert_eq!(furnace.items().count(ResourceSelector::of(ingot)), 3);
}

#[test]
fn test_missing_machine_reports_path() {
    let dir = TempDir::new().unwrap();
    write_content(&dir);

    let factory = ContentFactory::new(dir.path());
    let error = factory.build_machine("smeltery").unwrap_err();
    assert!(error.to_string().contains("smeltery.ron"));
}
