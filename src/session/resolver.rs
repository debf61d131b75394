//! Picks where a reply to an inbound message should go.

use super::MessageContext;
use crate::directory::Recipient;
use crate::error::{Error, Result};

/// Reply target for an inbound message.
///
/// - group conversation: the room, whoever sent the message;
/// - direct message sent by our own account from another client: the
///   listener it was addressed to;
/// - direct message from the correspondent: back to the sender.
pub fn resolve_reply_target(ctx: &MessageContext) -> Result<Recipient> {
    if let Some(room) = &ctx.room {
        return Ok(Recipient::Room(room.clone()));
    }

    if ctx.is_from_self {
        return ctx
            .listener
            .clone()
            .map(Recipient::Contact)
            .ok_or_else(|| {
                Error::Resolution("self-sent direct message without a listener".to_string())
            });
    }

    Ok(Recipient::Contact(ctx.sender.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{Contact, Room};

    fn context(is_from_self: bool, room: Option<Room>, listener: Option<Contact>) -> MessageContext {
        MessageContext {
            is_from_self,
            room,
            listener,
            sender: Contact::new("sender", "Sender"),
        }
    }

    #[test]
    fn test_group_wins_regardless_of_sender() {
        let room = Room::new("r1", "Family");
        for from_self in [true, false] {
            let target = resolve_reply_target(&context(from_self, Some(room.clone()), None)).unwrap();
            assert_eq!(target, Recipient::Room(room.clone()));
        }
    }

    #[test]
    fn test_self_sent_direct_goes_to_listener() {
        let listener = Contact::new("friend", "Friend");
        let target = resolve_reply_target(&context(true, None, Some(listener.clone()))).unwrap();
        assert_eq!(target, Recipient::Contact(listener));
    }

    #[test]
    fn test_self_sent_direct_without_listener_fails() {
        let err = resolve_reply_target(&context(true, None, None)).unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
    }

    #[test]
    fn test_peer_direct_goes_back_to_sender() {
        let listener = Contact::new("me", "Me");
        let target = resolve_reply_target(&context(false, None, Some(listener))).unwrap();
        assert_eq!(target, Recipient::Contact(Contact::new("sender", "Sender")));
    }
}
