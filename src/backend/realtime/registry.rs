/**
 * Membership Registry
 *
 * Bidirectional index of who is where:
 *
 * - room → sockets
 * - socket → rooms (plus its identity, namespace and outbound channel)
 * - identity → sockets
 * - identity → rooms, reference-counted across the identity's sockets
 *
 * All four indices sit behind one mutex and are updated together, so they
 * are mutually consistent whenever the lock is released. The lock is never
 * held across an await point.
 *
 * The registry makes no authorization decisions. `join` takes the verdict
 * of the role resolver and permission matrix as a plain boolean.
 */
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::connection::{ConnectionContext, Namespace, SocketId};
use super::room::Room;
use crate::shared::ServerEvent;

/// Outbound channel of one socket
pub type SocketSender = UnboundedSender<ServerEvent>;

/// Result of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    Denied,
    /// The socket is not registered or belongs to another identity
    UnknownSocket,
}

/// Result of a leave request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The socket was not in the room
    NotMember,
    /// The socket left; another socket of the identity is still in the room
    StillPresent,
    /// The socket left and the identity no longer occupies the room
    Vacated,
}

impl LeaveOutcome {
    pub fn left(self) -> bool {
        !matches!(self, LeaveOutcome::NotMember)
    }
}

/// What a disconnect released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    pub identity: Uuid,
    pub namespace: Namespace,
    /// Every room the socket was in
    pub rooms: Vec<Room>,
    /// Rooms the identity no longer occupies through any socket
    pub rooms_vacated: Vec<Room>,
    /// Whether this was the identity's last socket
    pub last_socket: bool,
}

#[derive(Debug)]
struct SocketEntry {
    identity: Uuid,
    namespace: Namespace,
    sender: SocketSender,
    rooms: HashSet<Room>,
}

#[derive(Debug, Default)]
struct Indices {
    sockets: HashMap<SocketId, SocketEntry>,
    rooms: HashMap<Room, HashSet<SocketId>>,
    identity_sockets: HashMap<Uuid, HashSet<SocketId>>,
    identity_rooms: HashMap<Uuid, HashMap<Room, usize>>,
}

impl Indices {
    fn add_membership(&mut self, identity: Uuid, socket: SocketId, room: &Room) -> bool {
        let Some(entry) = self.sockets.get_mut(&socket) else {
            return false;
        };
        if !entry.rooms.insert(room.clone()) {
            return false;
        }
        self.rooms.entry(room.clone()).or_default().insert(socket);
        *self
            .identity_rooms
            .entry(identity)
            .or_default()
            .entry(room.clone())
            .or_insert(0) += 1;
        true
    }

    /// Remove one socket from one room; returns whether the identity vacated it
    fn remove_membership(&mut self, identity: Uuid, socket: SocketId, room: &Room) -> Option<bool> {
        let entry = self.sockets.get_mut(&socket)?;
        if !entry.rooms.remove(room) {
            return None;
        }

        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&socket);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }

        let mut vacated = false;
        if let Some(rooms) = self.identity_rooms.get_mut(&identity) {
            if let Some(count) = rooms.get_mut(room) {
                *count -= 1;
                if *count == 0 {
                    rooms.remove(room);
                    vacated = true;
                }
            }
            if rooms.is_empty() {
                self.identity_rooms.remove(&identity);
            }
        }
        Some(vacated)
    }
}

/// Snapshot of registry sizes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub sockets: usize,
    pub rooms: usize,
    pub identities: usize,
}

/// Process-wide room membership index
#[derive(Debug, Default)]
pub struct MembershipRegistry {
    indices: Mutex<Indices>,
}

impl MembershipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Indices> {
        self.indices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly authenticated socket and enroll it in its personal room
    pub fn register_socket(&self, ctx: &ConnectionContext, sender: SocketSender) {
        let identity = ctx.user_id();
        let mut indices = self.lock();
        indices.sockets.insert(
            ctx.socket_id,
            SocketEntry {
                identity,
                namespace: ctx.namespace,
                sender,
                rooms: HashSet::new(),
            },
        );
        indices
            .identity_sockets
            .entry(identity)
            .or_default()
            .insert(ctx.socket_id);
        indices.add_membership(identity, ctx.socket_id, &Room::user(ctx.namespace, identity));
        tracing::debug!(
            "[Registry] Registered socket {} for user {} on {}",
            ctx.socket_id,
            identity,
            ctx.namespace
        );
    }

    /// Add a socket to a room
    ///
    /// # Arguments
    /// * `authorized` - Verdict of the permission check made by the caller
    pub fn join(&self, identity: Uuid, socket: SocketId, room: &Room, authorized: bool) -> JoinOutcome {
        if !authorized {
            tracing::debug!("[Registry] Join of {} to {} denied", socket, room);
            return JoinOutcome::Denied;
        }
        let mut indices = self.lock();
        match indices.sockets.get(&socket) {
            Some(entry) if entry.identity == identity && entry.namespace == room.namespace() => {}
            _ => return JoinOutcome::UnknownSocket,
        }
        if indices.add_membership(identity, socket, room) {
            tracing::debug!("[Registry] Socket {} joined {}", socket, room);
            JoinOutcome::Joined
        } else {
            JoinOutcome::AlreadyMember
        }
    }

    /// Remove a socket from a room
    ///
    /// `Vacated` means the identity's last socket in the room just left.
    pub fn leave(&self, identity: Uuid, socket: SocketId, room: &Room) -> LeaveOutcome {
        let mut indices = self.lock();
        match indices.sockets.get(&socket) {
            Some(entry) if entry.identity == identity => {}
            _ => return LeaveOutcome::NotMember,
        }
        match indices.remove_membership(identity, socket, room) {
            None => LeaveOutcome::NotMember,
            Some(vacated) => {
                tracing::debug!("[Registry] Socket {} left {} (vacated: {})", socket, room, vacated);
                if vacated {
                    LeaveOutcome::Vacated
                } else {
                    LeaveOutcome::StillPresent
                }
            }
        }
    }

    /// Release everything a socket held
    ///
    /// Calling this twice for the same socket returns `None` the second time
    /// and changes nothing.
    pub fn on_disconnect(&self, socket: SocketId) -> Option<DisconnectOutcome> {
        let mut indices = self.lock();
        let (identity, namespace, rooms) = {
            let entry = indices.sockets.get(&socket)?;
            let mut rooms: Vec<Room> = entry.rooms.iter().cloned().collect();
            rooms.sort();
            (entry.identity, entry.namespace, rooms)
        };

        let mut rooms_vacated = Vec::new();
        for room in &rooms {
            if indices.remove_membership(identity, socket, room) == Some(true) {
                rooms_vacated.push(room.clone());
            }
        }
        indices.sockets.remove(&socket);

        let mut last_socket = false;
        if let Some(sockets) = indices.identity_sockets.get_mut(&identity) {
            sockets.remove(&socket);
            if sockets.is_empty() {
                indices.identity_sockets.remove(&identity);
                indices.identity_rooms.remove(&identity);
                last_socket = true;
            }
        }

        tracing::debug!(
            "[Registry] Socket {} released {} rooms ({} vacated)",
            socket,
            rooms.len(),
            rooms_vacated.len()
        );
        Some(DisconnectOutcome {
            identity,
            namespace,
            rooms,
            rooms_vacated,
            last_socket,
        })
    }

    pub fn sockets_in_room(&self, room: &Room) -> Vec<SocketId> {
        let indices = self.lock();
        let mut sockets: Vec<SocketId> = indices
            .rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        sockets.sort();
        sockets
    }

    /// Rooms occupied by an identity through any of its sockets
    pub fn rooms_of(&self, identity: Uuid) -> BTreeSet<Room> {
        self.lock()
            .identity_rooms
            .get(&identity)
            .map(|rooms| rooms.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Distinct identities present in a room
    pub fn identities_in_room(&self, room: &Room) -> Vec<Uuid> {
        let indices = self.lock();
        let mut identities: Vec<Uuid> = indices
            .rooms
            .get(room)
            .into_iter()
            .flatten()
            .filter_map(|socket| indices.sockets.get(socket).map(|e| e.identity))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        identities.sort();
        identities
    }

    pub fn sockets_of(&self, identity: Uuid) -> Vec<SocketId> {
        let mut sockets: Vec<SocketId> = self
            .lock()
            .identity_sockets
            .get(&identity)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        sockets.sort();
        sockets
    }

    pub fn is_member(&self, socket: SocketId, room: &Room) -> bool {
        self.lock()
            .sockets
            .get(&socket)
            .is_some_and(|entry| entry.rooms.contains(room))
    }

    pub fn is_connected(&self, socket: SocketId) -> bool {
        self.lock().sockets.contains_key(&socket)
    }

    pub(crate) fn sender(&self, socket: SocketId) -> Option<SocketSender> {
        self.lock().sockets.get(&socket).map(|e| e.sender.clone())
    }

    /// Senders of every socket in the given rooms, each socket once
    pub(crate) fn senders_in_rooms<'a>(
        &self,
        rooms: impl IntoIterator<Item = &'a Room>,
        except: Option<SocketId>,
    ) -> Vec<(SocketId, SocketSender)> {
        let indices = self.lock();
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for room in rooms {
            for socket in indices.rooms.get(room).into_iter().flatten() {
                if Some(*socket) == except || !seen.insert(*socket) {
                    continue;
                }
                if let Some(entry) = indices.sockets.get(socket) {
                    targets.push((*socket, entry.sender.clone()));
                }
            }
        }
        targets
    }

    pub(crate) fn senders_in_namespace(&self, namespace: Namespace) -> Vec<(SocketId, SocketSender)> {
        self.lock()
            .sockets
            .iter()
            .filter(|(_, entry)| entry.namespace == namespace)
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let indices = self.lock();
        RegistryStats {
            sockets: indices.sockets.len(),
            rooms: indices.rooms.len(),
            identities: indices.identity_sockets.len(),
        }
    }

    /// Check that all indices agree with each other
    ///
    /// # Returns
    /// A description of the first inconsistency found
    pub fn verify_indices(&self) -> Result<(), String> {
        let indices = self.lock();

        for (room, members) in &indices.rooms {
            if members.is_empty() {
                return Err(format!("empty room {} kept", room));
            }
            for socket in members {
                let entry = indices
                    .sockets
                    .get(socket)
                    .ok_or_else(|| format!("room {} lists unknown socket {}", room, socket))?;
                if !entry.rooms.contains(room) {
                    return Err(format!("socket {} missing back-reference to {}", socket, room));
                }
            }
        }

        let mut expected: HashMap<Uuid, HashMap<Room, usize>> = HashMap::new();
        for (socket, entry) in &indices.sockets {
            if !indices
                .identity_sockets
                .get(&entry.identity)
                .is_some_and(|s| s.contains(socket))
            {
                return Err(format!("identity {} missing socket {}", entry.identity, socket));
            }
            for room in &entry.rooms {
                if !indices.rooms.get(room).is_some_and(|m| m.contains(socket)) {
                    return Err(format!("room {} missing socket {}", room, socket));
                }
                *expected
                    .entry(entry.identity)
                    .or_default()
                    .entry(room.clone())
                    .or_insert(0) += 1;
            }
        }

        for (identity, sockets) in &indices.identity_sockets {
            if sockets.is_empty() {
                return Err(format!("identity {} kept without sockets", identity));
            }
            for socket in sockets {
                if !indices.sockets.contains_key(socket) {
                    return Err(format!("identity {} lists unknown socket {}", identity, socket));
                }
            }
        }

        if expected != indices.identity_rooms {
            return Err("identity room counts out of sync".to_string());
        }
        Ok(())
    }
}
