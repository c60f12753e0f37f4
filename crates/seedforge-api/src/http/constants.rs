//! Shared HTTP constants (headers, problem URIs, stream settings).

pub(crate) const HEADER_LAST_EVENT_ID: &str = "last-event-id";
pub(crate) const SSE_KEEP_ALIVE_SECS: u64 = 20;
pub(crate) const CONTENT_TYPE_TORRENT: &str = "application/x-bittorrent";

pub(crate) const PROBLEM_INTERNAL: &str = "https://seedforge.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://seedforge.dev/problems/bad-request";
pub(crate) const PROBLEM_VALIDATION: &str = "https://seedforge.dev/problems/validation";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://seedforge.dev/problems/not-found";
pub(crate) const PROBLEM_PERMISSION_DENIED: &str =
    "https://seedforge.dev/problems/permission-denied";
pub(crate) const PROBLEM_REMOTE_PATH_NOT_FOUND: &str =
    "https://seedforge.dev/problems/remote-path-not-found";
pub(crate) const PROBLEM_BUSY: &str = "https://seedforge.dev/problems/remote-busy";
pub(crate) const PROBLEM_UNAUTHORIZED: &str = "https://seedforge.dev/problems/remote-unauthorized";
pub(crate) const PROBLEM_CONNECTION: &str = "https://seedforge.dev/problems/remote-unreachable";
pub(crate) const PROBLEM_UNSUPPORTED: &str =
    "https://seedforge.dev/problems/unsupported-parameters";
pub(crate) const PROBLEM_TIMEOUT: &str = "https://seedforge.dev/problems/timeout";
pub(crate) const PROBLEM_REMOTE: &str = "https://seedforge.dev/problems/remote-error";
pub(crate) const PROBLEM_CONFLICT: &str = "https://seedforge.dev/problems/conflict";
pub(crate) const PROBLEM_CONFIG_INVALID: &str = "https://seedforge.dev/problems/config-invalid";

pub(crate) const EVENT_KIND_WHITELIST: &[&str] = &[
    "queued",
    "submitted",
    "progress",
    "done",
    "error",
    "settings_changed",
    "health_changed",
];
