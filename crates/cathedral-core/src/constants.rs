// Dataset names shared by the built-in catalog, the synthesized tables and
// the correlation joins.

pub const CODEX_NODES: &str = "codex_nodes";
pub const ANGELS_72: &str = "angels_72";
pub const ALCHEMY_OPERATIONS: &str = "alchemy_operations";
pub const MYSTERY_HOUSE: &str = "mystery_house";
pub const PORTAL_NETWORK: &str = "portal_network";
pub const SACRED_GEOMETRY: &str = "sacred_geometry";
pub const CRYSTAL_FREQUENCIES: &str = "crystal_frequencies";
pub const CHAKRA_SYSTEM: &str = "chakra_system";
pub const TAROT_INTEGRATION: &str = "tarot_integration";
pub const DAEMON_GUARDIANS: &str = "daemon_guardians";
pub const TARA_OVERLAYS: &str = "tara_overlays";
pub const REIKI_SYMBOLS: &str = "reiki_symbols";
pub const SHADOW_WORK_ELEMENTS: &str = "shadow_work_elements";
pub const ADVANCED_ALCHEMY: &str = "advanced_alchemy";
pub const TRAUMA_SAFEGUARDS: &str = "trauma_safeguards";
pub const GROUNDING_TECHNIQUES: &str = "grounding_techniques";
pub const EMERGENCY_EXITS: &str = "emergency_exits";

/// Dataset every entity lookup starts from.
pub const PRIMARY_DATASET: &str = CODEX_NODES;

/// Number of nodes in the codex; the daily focus cycles through them.
pub const CODEX_CYCLE: u32 = 144;

/// Number of angels; node ids fold onto angel numbers modulo this.
pub const ANGEL_CYCLE: u32 = 72;

/// Fraction of sourced datasets that must fail before the controller
/// falls back to emergency gentle mode.
pub const EMERGENCY_FAILURE_RATIO: f64 = 0.5;

/// Key the settings snapshot is stored under.
pub const SETTINGS_KEY: &str = "cathedral_dataset_settings";
