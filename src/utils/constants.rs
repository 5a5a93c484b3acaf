//! Shared constants and invariants

/// Tokens are treated as stale this many seconds before they expire.
pub const SAFETY_MARGIN_SECONDS_DEFAULT: u64 = 225;

pub const SCOPE_SQLSERVICE_LOGIN: &str = "https://www.googleapis.com/auth/sqlservice.login";
pub const SCOPE_SQLSERVICE_ADMIN: &str = "https://www.googleapis.com/auth/sqlservice.admin";

/// Scope set used for IAM database login when none is configured.
pub const CLOUDSQL_IAM_LOGIN_SCOPES: [&str; 2] = [SCOPE_SQLSERVICE_LOGIN, SCOPE_SQLSERVICE_ADMIN];

pub const SQL_ADMIN_ENDPOINT_DEFAULT: &str = "https://sqladmin.googleapis.com";
pub const SQL_ADMIN_API_VERSION: &str = "v1beta4";

/// Application default tokens are re-read from `google-cloud-auth` this often;
/// the library refreshes the underlying token itself.
pub const ADC_RECHECK_SECONDS: u64 = 300;
