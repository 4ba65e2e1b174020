// libs/video-conferencing-cell/src/services/roster.rs
use std::collections::HashMap;

use tracing::debug;

use crate::models::{ParticipantEvent, RemoteParticipant};

/// Remote participants of one session, keyed by uid.
#[derive(Debug, Default)]
pub struct Roster {
    participants: HashMap<u32, RemoteParticipant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, event: &ParticipantEvent) {
        match *event {
            ParticipantEvent::UserPublished { uid, kind } => {
                self.participants
                    .entry(uid)
                    .or_insert_with(|| RemoteParticipant::new(uid))
                    .set_track(kind, true);
            }
            ParticipantEvent::UserUnpublished { uid, kind } => {
                let Some(participant) = self.participants.get_mut(&uid) else {
                    debug!("Unpublish from unknown participant {}", uid);
                    return;
                };
                participant.set_track(kind, false);
                // still in the channel but publishing nothing: not shown
                if !participant.publishes_anything() {
                    self.participants.remove(&uid);
                }
            }
            ParticipantEvent::UserLeft { uid } => {
                self.participants.remove(&uid);
            }
        }
    }

    pub fn get(&self, uid: u32) -> Option<&RemoteParticipant> {
        self.participants.get(&uid)
    }

    /// Participants ordered by uid.
    pub fn snapshot(&self) -> Vec<RemoteParticipant> {
        let mut participants: Vec<_> = self.participants.values().copied().collect();
        participants.sort_by_key(|p| p.uid);
        participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn clear(&mut self) {
        self.participants.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaKind;

    #[test]
    fn repeated_publish_updates_in_place() {
        let mut roster = Roster::new();
        roster.apply(&ParticipantEvent::UserPublished { uid: 7, kind: MediaKind::Audio });
        roster.apply(&ParticipantEvent::UserPublished { uid: 7, kind: MediaKind::Audio });
        roster.apply(&ParticipantEvent::UserPublished { uid: 7, kind: MediaKind::Video });

        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(7), Some(&RemoteParticipant { uid: 7, audio: true, video: true }));
    }

    #[test]
    fn unpublish_keeps_participant_with_remaining_track() {
        let mut roster = Roster::new();
        roster.apply(&ParticipantEvent::UserPublished { uid: 7, kind: MediaKind::Audio });
        roster.apply(&ParticipantEvent::UserPublished { uid: 7, kind: MediaKind::Video });

        roster.apply(&ParticipantEvent::UserUnpublished { uid: 7, kind: MediaKind::Video });
        assert_eq!(roster.get(7), Some(&RemoteParticipant { uid: 7, audio: true, video: false }));

        roster.apply(&ParticipantEvent::UserUnpublished { uid: 7, kind: MediaKind::Audio });
        assert!(roster.is_empty());
    }

    #[test]
    fn left_removes_and_unknown_uids_are_ignored() {
        let mut roster = Roster::new();
        roster.apply(&ParticipantEvent::UserUnpublished { uid: 1, kind: MediaKind::Audio });
        roster.apply(&ParticipantEvent::UserLeft { uid: 1 });
        assert!(roster.is_empty());

        roster.apply(&ParticipantEvent::UserPublished { uid: 9, kind: MediaKind::Video });
        roster.apply(&ParticipantEvent::UserPublished { uid: 2, kind: MediaKind::Audio });
        assert_eq!(roster.snapshot().iter().map(|p| p.uid).collect::<Vec<_>>(), vec![2, 9]);

        roster.apply(&ParticipantEvent::UserLeft { uid: 9 });
        assert_eq!(roster.len(), 1);
    }
}
