use tasklist_core::{KvRepository, MemoryKvRepository, StoreConfig, Theme, ThemeService};

#[test]
fn missing_key_reads_as_default_theme() {
    let repo = MemoryKvRepository::new();
    let service = ThemeService::new(&repo, &StoreConfig::default());
    assert_eq!(service.load(), Theme::Dark);
}

#[test]
fn light_is_stored_and_dark_removes_the_key() {
    let repo = MemoryKvRepository::new();
    let service = ThemeService::new(&repo, &StoreConfig::default());

    service.save(Theme::Light).unwrap();
    assert_eq!(repo.get("theme").unwrap().as_deref(), Some("light"));
    assert_eq!(service.load(), Theme::Light);

    service.save(Theme::Dark).unwrap();
    assert!(repo.get("theme").unwrap().is_none());
}

#[test]
fn toggle_flips_between_themes() {
    let repo = MemoryKvRepository::new();
    let service = ThemeService::new(&repo, &StoreConfig::default());
    assert_eq!(service.toggle().unwrap(), Theme::Light);
    assert_eq!(service.toggle().unwrap(), Theme::Dark);
}

#[test]
fn unknown_stored_value_reads_as_default() {
    let repo = MemoryKvRepository::new();
    repo.set("theme", "solarized").unwrap();
    let service = ThemeService::new(&repo, &StoreConfig::default());
    assert_eq!(service.load(), Theme::Dark);
}
