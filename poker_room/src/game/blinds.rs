//! Blind posting.

use super::{
    entities::{Blinds, Chips, Seat, SeatIndex},
    errors::GameError,
};

/// Chips actually posted by the two blind seats. A short stack posts less
/// than the configured blind and goes all-in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PostedBlinds {
    pub small: Chips,
    pub big: Chips,
}

/// Owns a table's blind amounts and posts them to the designated seats.
#[derive(Clone, Debug)]
pub struct BlindsManager {
    blinds: Blinds,
}

impl BlindsManager {
    #[must_use]
    pub fn new(blinds: Blinds) -> Self {
        Self { blinds }
    }

    #[must_use]
    pub fn blinds(&self) -> Blinds {
        self.blinds
    }

    /// Move each blind from the seat's stack into its round commitment.
    ///
    /// Only the two designated seats are touched. The pot is left for the
    /// caller to rebuild.
    pub fn post_blinds(
        &self,
        seats: &mut [Option<Seat>],
        small_blind_seat: SeatIndex,
        big_blind_seat: SeatIndex,
    ) -> Result<PostedBlinds, GameError> {
        for idx in [small_blind_seat, big_blind_seat] {
            match seats.get(idx) {
                Some(Some(_)) => {}
                Some(None) => return Err(GameError::EmptySeat(idx)),
                None => return Err(GameError::SeatOutOfRange(idx)),
            }
        }

        let small = post(seats, small_blind_seat, self.blinds.small);
        let big = post(seats, big_blind_seat, self.blinds.big);
        log::debug!(
            "Posted blinds {}/{} from seats {}/{}",
            small,
            big,
            small_blind_seat,
            big_blind_seat
        );
        Ok(PostedBlinds { small, big })
    }
}

fn post(seats: &mut [Option<Seat>], idx: SeatIndex, amount: Chips) -> Chips {
    seats
        .get_mut(idx)
        .and_then(Option::as_mut)
        .map_or(0, |seat| seat.commit(amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::SeatStatus;

    fn seats(stacks: &[Chips]) -> Vec<Option<Seat>> {
        stacks
            .iter()
            .enumerate()
            .map(|(i, &stack)| {
                let mut seat = Seat::new(i as i64, format!("p{i}"), stack);
                seat.status = SeatStatus::Active;
                Some(seat)
            })
            .collect()
    }

    #[test]
    fn test_posts_configured_amounts() {
        let manager = BlindsManager::new(Blinds { small: 5, big: 10 });
        let mut seats = seats(&[100, 100, 100]);
        let posted = manager.post_blinds(&mut seats, 1, 2).unwrap();
        assert_eq!(posted, PostedBlinds { small: 5, big: 10 });
        let sb = seats[1].as_ref().unwrap();
        let bb = seats[2].as_ref().unwrap();
        assert_eq!((sb.stack, sb.current_bet), (95, 5));
        assert_eq!((bb.stack, bb.current_bet), (90, 10));
        assert_eq!(seats[0].as_ref().unwrap().stack, 100);
    }

    #[test]
    fn test_short_stack_blind_goes_all_in() {
        let manager = BlindsManager::new(Blinds { small: 50, big: 100 });
        let mut seats = seats(&[30, 60]);
        let posted = manager.post_blinds(&mut seats, 0, 1).unwrap();
        assert_eq!(posted, PostedBlinds { small: 30, big: 60 });
        for seat in seats.iter().flatten() {
            assert_eq!(seat.stack, 0);
            assert_eq!(seat.status, SeatStatus::AllIn);
        }
    }

    #[test]
    fn test_empty_blind_seat_rejected_without_mutation() {
        let manager = BlindsManager::new(Blinds { small: 5, big: 10 });
        let mut seats = seats(&[100, 100]);
        seats.push(None);
        let before = seats.clone();
        assert_eq!(
            manager.post_blinds(&mut seats, 0, 2),
            Err(GameError::EmptySeat(2))
        );
        assert_eq!(
            manager.post_blinds(&mut seats, 0, 9),
            Err(GameError::SeatOutOfRange(9))
        );
        assert_eq!(seats, before);
    }
}
