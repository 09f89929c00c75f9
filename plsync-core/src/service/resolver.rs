//! Discord role → power level resolution

use std::cmp::Reverse;
use std::collections::HashMap;

use crate::models::{MemberContent, RoleMap, RoomId};

/// Desired power level for a bridged member, or `None` for "leave unchanged".
///
/// Roles are tried from highest to lowest position and the first one present in
/// the room's role map wins. The sort is stable, so roles sharing a position keep
/// the order the bridge sent them in.
#[must_use]
pub fn resolve(
    room_id: &RoomId,
    member: &MemberContent,
    rooms: &HashMap<RoomId, RoleMap>,
) -> Option<i64> {
    let role_map = rooms.get(room_id).filter(|map| !map.is_empty())?;
    let roles = member.roles()?;

    let mut ordered: Vec<_> = roles.iter().collect();
    ordered.sort_by_key(|role| Reverse(role.position));

    ordered.into_iter().find_map(|role| {
        let level = role_map.get(&role.name).copied()?;
        tracing::debug!(room_id = %room_id, role = %role.name, level, "Found mapped role");
        Some(level)
    })
}
