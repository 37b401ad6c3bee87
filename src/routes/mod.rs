/// Router Module Index
///
/// Splits the route table by access level. Public routes may be reached
/// anonymously; authenticated routes sit behind the session check applied
/// as a route layer in `create_router`.

/// Routes reachable without a session (browsing, sign-in, health).
pub mod public;

/// Routes that require a session. Ownership and authorship checks happen
/// per route through the `OwnedListing` and `ReviewAuthor` guards.
pub mod authenticated;
