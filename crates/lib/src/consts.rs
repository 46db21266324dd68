//! Shared constants for hatskit.

/// Application name, used in the user agent.
pub const APP_NAME: &str = "hatskit";

/// Builder version recorded in summaries.
pub const BUILDER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Component manifest file name.
pub const COMPONENTS_FILENAME: &str = "components.json";

/// Baseline archive extracted into every build.
pub const SKELETON_FILENAME: &str = "skeleton.zip";

/// User settings file name.
pub const SETTINGS_FILENAME: &str = "config.json";

/// Resolution cache file name.
pub const CACHE_FILENAME: &str = "hatskit_cache.json";

/// Last build record file name.
pub const LAST_BUILD_FILENAME: &str = "last_build.json";

/// Temporary download directory name.
pub const DOWNLOAD_DIR: &str = "temp_downloads";

/// Build tree directory name.
pub const BUILD_DIR: &str = "build";

/// Prefix of every output artifact name.
pub const OUTPUT_FILENAME_BASE: &str = "HATS";

/// Length of the hex content hash embedded in artifact names.
pub const CONTENT_HASH_LEN: usize = 7;

/// Hours a cache entry stays authoritative without revalidation.
pub const CACHE_TTL_HOURS: i64 = 12;

/// Default release API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Version label for components without a resolved asset.
pub const UNKNOWN_VERSION: &str = "N/A";

/// Version label for direct URL components without a pinned tag.
pub const DIRECT_VERSION: &str = "direct";

/// Buffer size used when streaming downloads to disk.
pub const DOWNLOAD_CHUNK_SIZE: usize = 8192;
