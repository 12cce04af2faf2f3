// SPDX-License-Identifier: MIT OR Apache-2.0

use magpie_core::{AccountKey, UserKey};
use magpie_store::Graph;

use crate::error::AuthError;

/// Resolve a linked external account to its catalog user.
///
/// The account is assumed to have been verified upstream (login handshake);
/// this only follows the `identity` edge.
pub fn resolve_identity(graph: &Graph, account: &AccountKey) -> Result<UserKey, AuthError> {
    graph
        .user_for_account(account)
        .cloned()
        .ok_or_else(|| AuthError::UnknownIdentity(account.clone()))
}
