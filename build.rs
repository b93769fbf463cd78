#[cfg(feature = "plugin")]
const COMMANDS: &[&str] = &["present", "can_share", "cleanup"];

fn main() {
    #[cfg(feature = "plugin")]
    tauri_plugin::Builder::new(COMMANDS).build();
}
