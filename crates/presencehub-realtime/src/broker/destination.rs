//! User destination helpers.
//!
//! Clients subscribe to `/user/queue/x`; the broker stores the subscription
//! under the subscriber's own namespace `/user/<username>/queue/x`, which is
//! where [`user_destination`] publishes.

/// Destination prefix for per-user queues.
pub const USER_PREFIX: &str = "/user/";

/// The concrete destination for `username` (`/user/<username><destination>`).
pub fn user_destination(username: &str, destination: &str) -> String {
    let destination = destination.trim_start_matches('/');
    format!("{USER_PREFIX}{username}/{destination}")
}

/// Rewrites a `/user/...` subscription into the subscriber's namespace.
/// Returns `None` for destinations outside `user_prefix`.
pub fn resolve_user_subscription(user_prefix: &str, username: &str, destination: &str) -> Option<String> {
    destination
        .strip_prefix(user_prefix)
        .map(|rest| user_destination(username, rest))
}
