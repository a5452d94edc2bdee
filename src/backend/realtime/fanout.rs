//! Cluster fanout seam.
//!
//! Every emit made by the broadcast router is also handed to a
//! [`ClusterFanout`]. A multi-instance deployment plugs in an
//! implementation that forwards events to its peers over a shared bus; a
//! single process uses [`LocalOnly`].

use uuid::Uuid;

use super::connection::{Namespace, SocketId};
use super::room::Room;
use crate::shared::ServerEvent;

/// Where an emitted event was addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FanoutTarget {
    Room(Room),
    RoomExcept(Room, SocketId),
    Identity(Namespace, Uuid),
    Namespace(Namespace),
}

pub trait ClusterFanout: Send + Sync {
    fn name(&self) -> &'static str;

    /// Forward a locally emitted event to other instances
    fn publish(&self, target: &FanoutTarget, event: &ServerEvent);
}

/// No peers; everything is delivered locally
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnly;

impl ClusterFanout for LocalOnly {
    fn name(&self) -> &'static str {
        "local-only"
    }

    fn publish(&self, _target: &FanoutTarget, _event: &ServerEvent) {}
}
