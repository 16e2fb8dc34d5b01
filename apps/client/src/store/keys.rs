/// Store key constants — every persisted collection lives under its own
/// namespaced key so role views sharing one profile never collide on names.
pub const AUTH_TOKEN: &str = "zogak_auth_token";
pub const USER_PROFILE: &str = "zogak_user_profile";
pub const MEMORIES: &str = "zogak_memories";
pub const MEDICATIONS: &str = "zogak_shared_medications";
pub const LOCATIONS: &str = "zogak_shared_locations";
pub const NOTIFICATIONS: &str = "zogak_shared_notifications";
pub const PAIRING: &str = "zogak_pairing";
pub const SAFE_ZONE: &str = "zogak_safe_zone";
pub const DIARY_ENTRIES: &str = "zogak_diary_entries";
