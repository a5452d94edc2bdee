//! Property-based tests for the membership registry

use proptest::prelude::*;
use std::collections::BTreeSet;
use tokio::sync::mpsc;
use uuid::Uuid;
use xfboard::backend::auth::{Claims, Identity};
use xfboard::backend::realtime::{ConnectionContext, LeaveOutcome, MembershipRegistry, Namespace, Room, SocketId};

use crate::common::user;

#[derive(Debug, Clone)]
enum Op {
    Join { socket: usize, room: usize },
    Leave { socket: usize, room: usize },
    Disconnect { socket: usize },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4, 0usize..3).prop_map(|(socket, room)| Op::Join { socket, room }),
        (0usize..4, 0usize..3).prop_map(|(socket, room)| Op::Leave { socket, room }),
        (0usize..4).prop_map(|socket| Op::Disconnect { socket }),
    ]
}

fn context(identity: Uuid) -> ConnectionContext {
    let mut profile = user("Prop", false);
    profile.id = identity;
    let identity = Identity {
        claims: Claims {
            sub: identity.to_string(),
            email: None,
            username: None,
            exp: 0,
            iat: 0,
        },
        user: profile,
    };
    ConnectionContext::new(Namespace::Board, identity, None)
}

/// Two identities with two sockets each
fn setup(registry: &MembershipRegistry) -> Vec<(Uuid, SocketId)> {
    let identities = [Uuid::new_v4(), Uuid::new_v4()];
    (0..4)
        .map(|i| {
            let ctx = context(identities[i % 2]);
            let (tx, _rx) = mpsc::unbounded_channel();
            registry.register_socket(&ctx, tx);
            (ctx.user_id(), ctx.socket_id)
        })
        .collect()
}

proptest! {
    #[test]
    fn test_indices_stay_consistent(ops in prop::collection::vec(op(), 0..60)) {
        let registry = MembershipRegistry::new();
        let sockets = setup(&registry);
        let rooms: Vec<Room> = (0..3).map(|_| Room::board(Uuid::new_v4())).collect();

        for op in ops {
            match op {
                Op::Join { socket, room } => {
                    let (identity, id) = sockets[socket];
                    registry.join(identity, id, &rooms[room], true);
                }
                Op::Leave { socket, room } => {
                    let (identity, id) = sockets[socket];
                    registry.leave(identity, id, &rooms[room]);
                }
                Op::Disconnect { socket } => {
                    let (_, id) = sockets[socket];
                    registry.on_disconnect(id);
                    prop_assert!(registry.on_disconnect(id).is_none());
                }
            }
            prop_assert!(registry.verify_indices().is_ok());
        }
    }

    #[test]
    fn test_join_then_leave_restores_membership(joined in prop::collection::btree_set(0usize..5, 0..5)) {
        let registry = MembershipRegistry::new();
        let sockets = setup(&registry);
        let (identity, socket) = sockets[0];
        let rooms: Vec<Room> = (0..5).map(|_| Room::board(Uuid::new_v4())).collect();
        for index in &joined {
            registry.join(identity, socket, &rooms[*index], true);
        }
        let before: BTreeSet<Room> = registry.rooms_of(identity);

        let extra = Room::board(Uuid::new_v4());
        registry.join(identity, socket, &extra, true);
        prop_assert!(registry.is_member(socket, &extra));
        prop_assert_eq!(registry.leave(identity, socket, &extra), LeaveOutcome::Vacated);

        prop_assert_eq!(registry.rooms_of(identity), before);
        prop_assert!(registry.sockets_in_room(&extra).is_empty());
    }

    #[test]
    fn test_denied_joins_change_nothing(room_count in 1usize..5) {
        let registry = MembershipRegistry::new();
        let sockets = setup(&registry);
        let (identity, socket) = sockets[1];
        let before = registry.stats();
        for _ in 0..room_count {
            registry.join(identity, socket, &Room::board(Uuid::new_v4()), false);
        }
        prop_assert_eq!(registry.stats(), before);
    }
}
