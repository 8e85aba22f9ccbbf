fn main() {
    println!("Run `cargo test -p store-compat` to execute persisted-format compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use rombridge_library_store::LibraryStore;
    use rombridge_protocol::{Catalog, GameStatus, LibraryData};
    use rombridge_settings::{AppConfig, ConfigStore};

    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn fixture_text(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    fn load_fixture(name: &str) -> serde_json::Value {
        let data = fixture_text(name);
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    /// Deserializes a fixture into `T`, re-serializes it and compares the
    /// JSON values.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed).unwrap();
        assert_eq!(reserialized, fixture, "round-trip mismatch for {name}");
    }

    /// Copies a fixture into a temp dir under `target_name`.
    fn staged(name: &str, target_name: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(target_name);
        fs::write(&path, fixture_text(name)).unwrap();
        (tmp, path)
    }

    #[test]
    fn library_data_roundtrip() {
        roundtrip_test::<LibraryData>("library-store.json");
    }

    #[test]
    fn config_roundtrip() {
        roundtrip_test::<AppConfig>("config.json");
    }

    #[test]
    fn catalog_roundtrip() {
        roundtrip_test::<Catalog>("catalog.json");
    }

    #[test]
    fn catalog_fixture_validates() {
        let catalog = Catalog::from_json(&fixture_text("catalog.json")).unwrap();
        let names: Vec<_> = catalog.source_names().collect();
        assert_eq!(names, vec!["dos", "scummvm"]);

        let scummvm = catalog.source("scummvm").unwrap();
        let (base, path) = scummvm.game("monkey1").unwrap().resource_location();
        assert_eq!(base, "https://archive.org");
        assert_eq!(path, "/download/scummvm-collection/monkey1.zip");
        let (base, _) = scummvm.game("bass").unwrap().resource_location();
        assert_eq!(base, "");
    }

    #[test]
    fn store_opens_existing_file_unchanged() {
        let (_tmp, path) = staged("library-store.json", "library-store.json");
        let before = fs::read_to_string(&path).unwrap();

        let store = LibraryStore::open(path.clone()).unwrap();
        assert_eq!(store.status("monkey1"), GameStatus::Extracted);
        assert_eq!(store.status("bass"), GameStatus::Downloaded);
        assert_eq!(store.status("loom"), GameStatus::ExtractedNoZip);
        assert_eq!(store.status("dott"), GameStatus::NotInstalled);
        assert_eq!(store.status("unknown"), GameStatus::NotInstalled);
        assert_eq!(store.all()["bass"].last_updated, 1_718_035_260_456);

        // No cleanup needed, so the file is not rewritten.
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn interrupted_operations_are_reset_on_open() {
        let (_tmp, path) = staged("library-store-interrupted.json", "library-store.json");

        let store = LibraryStore::open(path.clone()).unwrap();
        assert_eq!(store.status("monkey1"), GameStatus::NotInstalled);
        assert_eq!(store.status("bass"), GameStatus::NotInstalled);
        assert_eq!(store.status("loom"), GameStatus::Extracted);

        let on_disk: LibraryData =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert!(on_disk.games.values().all(|r| !r.status.is_transient()));
        assert_eq!(on_disk.games.len(), 3);
    }

    #[test]
    fn written_library_keeps_file_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("library-store.json");
        let store = LibraryStore::open(path.clone()).unwrap();
        store.set_status("monkey1", GameStatus::ExtractedNoZip).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let record = &value["games"]["monkey1"];
        assert_eq!(record["id"], "monkey1");
        assert_eq!(record["status"], "EXTRACTED_NO_ZIP");
        assert!(record["lastUpdated"].is_i64());
    }

    #[test]
    fn config_store_reads_fixture() {
        let (_tmp, path) = staged("config.json", "config.json");
        let config = ConfigStore::new(path).get();
        assert_eq!(config.ssh_host.as_deref(), Some("192.168.1.101"));
        assert_eq!(config.ssh_port, Some(22));
        assert_eq!(config.ssh_user.as_deref(), Some("pi"));
        assert_eq!(
            config.target_folders.unwrap()["scummvm"],
            "/userdata/roms/scummvm"
        );
    }

    #[test]
    fn config_save_get_is_deep_equal() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(tmp.path().join("config.json"));
        let config: AppConfig = serde_json::from_value(load_fixture("config.json")).unwrap();
        store.save(&config).unwrap();
        assert_eq!(store.get(), config);
    }
}
