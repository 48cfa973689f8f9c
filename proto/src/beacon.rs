use crate::code::RoomCode;
use crate::record::Role;

/// Payload of every unload beacon: a JSON `null` written over the target
pub const BEACON_PAYLOAD: &str = "null";

/// REST target that undoes a peer's presence when it vanishes without cleanup.
///
/// The host deletes the whole room, the guest only its presence flag.
pub fn beacon_url(base: &str, role: Role, code: &RoomCode) -> String {
    let base = base.trim_end_matches('/');
    match role {
        Role::Host => format!("{base}/rooms/{code}.json"),
        Role::Guest => format!("{base}/rooms/{code}/g.json"),
    }
}

/// Inverse of [`beacon_url`]
pub fn parse_beacon_url(base: &str, url: &str) -> Option<(RoomCode, Role)> {
    let path = url.strip_prefix(base.trim_end_matches('/'))?;
    let rest = path.strip_prefix("/rooms/")?;

    if let Some(code) = rest.strip_suffix("/g.json") {
        return RoomCode::parse(code).ok().map(|c| (c, Role::Guest));
    }
    let code = rest.strip_suffix(".json")?;
    RoomCode::parse(code).ok().map(|c| (c, Role::Host))
}
