//! Authoritative match state and the per-tick state machine.
//!
//! A [`MatchState`] is an immutable snapshot: [`MatchState::step`] never
//! mutates its receiver, it returns the next snapshot together with the
//! events that happened during the tick. The tick loop is the only caller, so
//! it is the only writer of the match.

use crate::physics::{clamp_paddle, Ball, Side, Vector2};
use shared::{
    Direction, StateMessage, Winner, FIELD_CENTER_Y, PADDLE_DISTANCE_FROM_GOAL, PADDLE_SPEED,
    WIDTH,
};

/// Number of player slots in a match.
pub const PLAYER_SLOTS: usize = 2;

/// Stable identity of a player for the lifetime of its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Player1,
    Player2,
}

impl Slot {
    pub const ALL: [Slot; PLAYER_SLOTS] = [Slot::Player1, Slot::Player2];

    pub fn index(self) -> usize {
        match self {
            Slot::Player1 => 0,
            Slot::Player2 => 1,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// Horizontal center of this slot's paddle.
    pub fn paddle_x(self) -> f32 {
        match self {
            Slot::Player1 => PADDLE_DISTANCE_FROM_GOAL,
            Slot::Player2 => WIDTH - PADDLE_DISTANCE_FROM_GOAL,
        }
    }
}

/// Latest direction per slot. Newer commands overwrite older ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerInputs {
    directions: [Direction; PLAYER_SLOTS],
}

impl PlayerInputs {
    pub fn set(&mut self, slot: Slot, direction: Direction) {
        self.directions[slot.index()] = direction;
    }

    pub fn get(&self, slot: Slot) -> Direction {
        self.directions[slot.index()]
    }

    pub fn clear(&mut self, slot: Slot) {
        self.set(slot, Direction::Still);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Fewer than two players, or paused after one left.
    Waiting,
    Running,
    /// Terminal.
    GameOver,
}

/// Something worth reporting that happened during a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchEvent {
    Started,
    Paused,
    Goal { scorer: Slot, score1: u32, score2: u32 },
    /// The ball left the field through a gap in the physics and was re-served.
    BallRescued,
    GameOver { winner: Winner, score1: u32, score2: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchState {
    pub paddle1_y: f32,
    pub paddle2_y: f32,
    pub ball: Ball,
    pub score1: u32,
    pub score2: u32,
    pub started: bool,
    /// Seconds left on the match clock.
    pub time_remaining: f32,
    pub over: bool,
    pub winner: Winner,
}

impl MatchState {
    /// Fresh match: paddles and ball centered, ball at rest, clock full.
    pub fn new(match_duration: f32) -> Self {
        Self {
            paddle1_y: FIELD_CENTER_Y,
            paddle2_y: FIELD_CENTER_Y,
            ball: Ball::idle(),
            score1: 0,
            score2: 0,
            started: false,
            time_remaining: match_duration.max(0.0),
            over: false,
            winner: Winner::None,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.over {
            Phase::GameOver
        } else if self.started {
            Phase::Running
        } else {
            Phase::Waiting
        }
    }

    pub fn paddle_y(&self, slot: Slot) -> f32 {
        match slot {
            Slot::Player1 => self.paddle1_y,
            Slot::Player2 => self.paddle2_y,
        }
    }

    pub fn to_message(&self) -> StateMessage {
        StateMessage {
            paddle1_y: self.paddle1_y,
            paddle2_y: self.paddle2_y,
            ball_x: self.ball.position.x,
            ball_y: self.ball.position.y,
            ball_vx: self.ball.velocity.x,
            ball_vy: self.ball.velocity.y,
            score1: self.score1,
            score2: self.score2,
            started: self.started,
            time_remaining: self.time_remaining,
            over: self.over,
            winner: self.winner,
        }
    }

    /// Computes the snapshot for the next tick.
    ///
    /// `sessions` is the number of registered players and `dt` the wall-clock
    /// seconds since the previous tick, which only drive the match clock. A
    /// tick that starts or pauses the match commits that transition alone;
    /// physics resumes on the following tick.
    pub fn step(
        &self,
        inputs: &PlayerInputs,
        sessions: usize,
        dt: f32,
    ) -> (MatchState, Vec<MatchEvent>) {
        let mut next = *self;
        let mut events = Vec::new();
        let ready = sessions >= PLAYER_SLOTS;

        match self.phase() {
            Phase::GameOver => return (next, events),
            Phase::Waiting => {
                if ready {
                    next.ball = Ball::serve();
                    next.started = true;
                    events.push(MatchEvent::Started);
                }
                return (next, events);
            }
            Phase::Running if !ready => {
                next.ball.stop();
                next.started = false;
                events.push(MatchEvent::Paused);
                return (next, events);
            }
            Phase::Running => {}
        }

        next.paddle1_y =
            clamp_paddle(self.paddle1_y + inputs.get(Slot::Player1).factor() * PADDLE_SPEED);
        next.paddle2_y =
            clamp_paddle(self.paddle2_y + inputs.get(Slot::Player2).factor() * PADDLE_SPEED);

        next.time_remaining = (self.time_remaining - dt.max(0.0)).max(0.0);
        if next.time_remaining <= 0.0 {
            next.winner = winner_for(next.score1, next.score2);
            next.ball.stop();
            next.over = true;
            next.started = false;
            events.push(MatchEvent::GameOver {
                winner: next.winner,
                score1: next.score1,
                score2: next.score2,
            });
            return (next, events);
        }

        next.ball.integrate();
        next.ball.bounce_off_walls();

        match next.ball.goal_entered() {
            Some(side) => {
                let scorer = match side {
                    Side::Left => {
                        next.score2 += 1;
                        Slot::Player2
                    }
                    Side::Right => {
                        next.score1 += 1;
                        Slot::Player1
                    }
                };
                next.ball = Ball::serve();
                events.push(MatchEvent::Goal {
                    scorer,
                    score1: next.score1,
                    score2: next.score2,
                });
            }
            None => {
                next.ball.bounce_off_goal_frames();
            }
        }

        // Both paddles are checked every tick; the ball may touch both.
        for slot in Slot::ALL {
            next.ball.bounce_off_paddle(Vector2 {
                x: slot.paddle_x(),
                y: next.paddle_y(slot),
            });
        }

        if next.ball.escaped() {
            next.ball = Ball::serve();
            events.push(MatchEvent::BallRescued);
        }

        (next, events)
    }
}

/// Higher score wins; a draw has no winner.
pub fn winner_for(score1: u32, score2: u32) -> Winner {
    match score1.cmp(&score2) {
        std::cmp::Ordering::Greater => Winner::Player1,
        std::cmp::Ordering::Less => Winner::Player2,
        std::cmp::Ordering::Equal => Winner::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared::{
        BALL_SPEED, FIELD_BOTTOM, FIELD_CENTER_X, FIELD_TOP, PADDLE_HEIGHT, TIME_LIMIT_SECONDS,
    };

    const DT: f32 = 1.0 / 60.0;

    fn running_state() -> MatchState {
        let (state, _) = MatchState::new(TIME_LIMIT_SECONDS).step(&PlayerInputs::default(), 2, DT);
        assert!(state.started);
        state
    }

    #[test]
    fn test_new_match_is_waiting_at_center() {
        let state = MatchState::new(TIME_LIMIT_SECONDS);
        assert_eq!(state.phase(), Phase::Waiting);
        assert_eq!(state.ball, Ball::idle());
        assert_eq!(state.paddle1_y, FIELD_CENTER_Y);
        assert_eq!(state.paddle2_y, FIELD_CENTER_Y);
        assert_eq!(state.time_remaining, TIME_LIMIT_SECONDS);
        assert_eq!(state.winner, Winner::None);
    }

    #[test]
    fn test_waits_for_second_player() {
        let state = MatchState::new(TIME_LIMIT_SECONDS);
        for sessions in [0, 1] {
            let (next, events) = state.step(&PlayerInputs::default(), sessions, DT);
            assert_eq!(next, state);
            assert!(events.is_empty());
        }
    }

    #[test]
    fn test_two_players_start_match_with_serve() {
        let state = MatchState::new(TIME_LIMIT_SECONDS);
        let (next, events) = state.step(&PlayerInputs::default(), 2, DT);

        assert!(next.started);
        assert_eq!(next.phase(), Phase::Running);
        assert_eq!(events, vec![MatchEvent::Started]);
        assert_eq!(next.ball.position.x, FIELD_CENTER_X);
        assert_eq!(next.ball.position.y, FIELD_CENTER_Y);
        assert_eq!(next.ball.velocity.x, BALL_SPEED);
        assert_eq!(next.ball.velocity.y, 0.0);
        // The clock does not move on the starting tick.
        assert_eq!(next.time_remaining, TIME_LIMIT_SECONDS);
    }

    #[test]
    fn test_step_does_not_touch_previous_snapshot() {
        let state = running_state();
        let copy = state;
        let _ = state.step(&PlayerInputs::default(), 2, DT);
        assert_eq!(state, copy);
    }

    #[test]
    fn test_paddle_moves_up_and_clamps_at_top() {
        let mut inputs = PlayerInputs::default();
        inputs.set(Slot::Player1, Direction::Up);
        let top = FIELD_TOP + PADDLE_HEIGHT / 2.0;

        let mut state = running_state();
        for _ in 0..100 {
            let before = state.paddle1_y;
            state = state.step(&inputs, 2, DT).0;
            let expected = (before - PADDLE_SPEED).max(top);
            assert_approx_eq!(state.paddle1_y, expected, 1e-4);
            assert!(state.paddle1_y >= top);
            assert_eq!(state.paddle2_y, FIELD_CENTER_Y);
        }
        assert_eq!(state.paddle1_y, top);
    }

    #[test]
    fn test_paddle_moves_down_and_clamps_at_bottom() {
        let mut inputs = PlayerInputs::default();
        inputs.set(Slot::Player2, Direction::Down);

        let mut state = running_state();
        for _ in 0..100 {
            state = state.step(&inputs, 2, DT).0;
        }
        assert_eq!(state.paddle2_y, FIELD_BOTTOM - PADDLE_HEIGHT / 2.0);
        assert_eq!(state.paddle1_y, FIELD_CENTER_Y);
    }

    #[test]
    fn test_paddles_frozen_while_waiting() {
        let mut inputs = PlayerInputs::default();
        inputs.set(Slot::Player1, Direction::Down);
        let state = MatchState::new(TIME_LIMIT_SECONDS);
        let (next, _) = state.step(&inputs, 1, DT);
        assert_eq!(next.paddle1_y, state.paddle1_y);
    }

    #[test]
    fn test_ball_advances_one_velocity_per_tick() {
        let state = running_state();
        let (next, events) = state.step(&PlayerInputs::default(), 2, DT);
        assert!(events.is_empty());
        assert_eq!(next.ball.position.x, FIELD_CENTER_X + BALL_SPEED);
        assert_approx_eq!(next.time_remaining, TIME_LIMIT_SECONDS - DT, 1e-4);
    }

    #[test]
    fn test_left_goal_scores_for_player_two() {
        let mut state = running_state();
        state.ball = Ball::at(50.0, 330.0, -BALL_SPEED, 0.0);

        let (next, events) = state.step(&PlayerInputs::default(), 2, DT);

        assert_eq!(next.score2, 1);
        assert_eq!(next.score1, 0);
        assert_eq!(next.ball, Ball::serve());
        assert_eq!(
            events,
            vec![MatchEvent::Goal {
                scorer: Slot::Player2,
                score1: 0,
                score2: 1
            }]
        );

        // The re-served ball is heading away; no second point next tick.
        let (after, events) = next.step(&PlayerInputs::default(), 2, DT);
        assert_eq!(after.score2, 1);
        assert!(events.is_empty());
    }

    #[test]
    fn test_right_goal_scores_for_player_one() {
        let mut state = running_state();
        state.ball = Ball::at(750.0, 300.0, BALL_SPEED, 0.0);

        let (next, events) = state.step(&PlayerInputs::default(), 2, DT);

        assert_eq!(next.score1, 1);
        assert_eq!(next.score2, 0);
        assert_eq!(next.ball, Ball::serve());
        assert!(matches!(
            events[0],
            MatchEvent::Goal {
                scorer: Slot::Player1,
                ..
            }
        ));
    }

    #[test]
    fn test_ball_outside_goal_window_bounces_off_post() {
        let mut state = running_state();
        state.ball = Ball::at(60.0, 150.0, -BALL_SPEED, 0.0);

        let (next, events) = state.step(&PlayerInputs::default(), 2, DT);

        assert!(events.is_empty());
        assert_eq!(next.score1 + next.score2, 0);
        assert_eq!(next.ball.velocity.x, BALL_SPEED);
    }

    #[test]
    fn test_paddle_returns_ball() {
        let mut state = running_state();
        let paddle_x = Slot::Player1.paddle_x();
        state.ball = Ball::at(paddle_x + 17.0, FIELD_CENTER_Y, -BALL_SPEED, 0.0);

        let (next, _) = state.step(&PlayerInputs::default(), 2, DT);

        assert_approx_eq!(next.ball.velocity.x, BALL_SPEED, 1e-5);
        assert_approx_eq!(next.ball.speed(), BALL_SPEED, 1e-5);
        assert!(next.ball.position.x > paddle_x);
    }

    #[test]
    fn test_disconnect_pauses_and_freezes() {
        let mut state = running_state();
        state.ball = Ball::at(300.0, 250.0, -4.0, 3.0);
        state.score1 = 2;
        state.paddle1_y = 200.0;

        let (paused, events) = state.step(&PlayerInputs::default(), 1, DT);

        assert_eq!(events, vec![MatchEvent::Paused]);
        assert!(!paused.started);
        assert_eq!(paused.phase(), Phase::Waiting);
        assert_eq!(paused.ball.velocity, Vector2::ZERO);
        assert_eq!(paused.ball.position, state.ball.position);
        assert_eq!(paused.score1, 2);
        assert_eq!(paused.paddle1_y, 200.0);

        // The clock stands still while waiting.
        let (still, _) = paused.step(&PlayerInputs::default(), 1, 5.0);
        assert_eq!(still.time_remaining, paused.time_remaining);
    }

    #[test]
    fn test_resume_re_serves_from_center() {
        let mut state = running_state();
        state.ball = Ball::at(300.0, 250.0, -4.0, 3.0);
        let (paused, _) = state.step(&PlayerInputs::default(), 1, DT);
        let (resumed, events) = paused.step(&PlayerInputs::default(), 2, DT);

        assert_eq!(events, vec![MatchEvent::Started]);
        assert_eq!(resumed.ball, Ball::serve());
    }

    #[test]
    fn test_time_up_declares_winner() {
        let mut state = running_state();
        state.score1 = 3;
        state.score2 = 1;
        state.time_remaining = 0.01;
        let ball_before = state.ball.position;

        let (over, events) = state.step(&PlayerInputs::default(), 2, DT);

        assert!(over.over);
        assert!(!over.started);
        assert_eq!(over.phase(), Phase::GameOver);
        assert_eq!(over.time_remaining, 0.0);
        assert_eq!(over.winner, Winner::Player1);
        assert_eq!(over.ball.velocity, Vector2::ZERO);
        // Remaining physics is skipped on the final tick.
        assert_eq!(over.ball.position, ball_before);
        assert_eq!(
            events,
            vec![MatchEvent::GameOver {
                winner: Winner::Player1,
                score1: 3,
                score2: 1
            }]
        );
    }

    #[test]
    fn test_game_over_is_terminal() {
        let mut state = running_state();
        state.time_remaining = 0.0;
        let (over, _) = state.step(&PlayerInputs::default(), 2, DT);

        let mut inputs = PlayerInputs::default();
        inputs.set(Slot::Player1, Direction::Up);
        for sessions in [0, 1, 2] {
            let (next, events) = over.step(&inputs, sessions, DT);
            assert_eq!(next, over);
            assert!(events.is_empty());
        }
    }

    #[test]
    fn test_winner_for_scores() {
        assert_eq!(winner_for(3, 1), Winner::Player1);
        assert_eq!(winner_for(0, 2), Winner::Player2);
        assert_eq!(winner_for(4, 4), Winner::None);
    }

    #[test]
    fn test_random_input_history_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(7);
        let directions = [Direction::Up, Direction::Still, Direction::Down];
        let top = FIELD_TOP + PADDLE_HEIGHT / 2.0;
        let bottom = FIELD_BOTTOM - PADDLE_HEIGHT / 2.0;

        let mut inputs = PlayerInputs::default();
        let mut state = MatchState::new(1.0e6);

        for _ in 0..20_000 {
            for slot in Slot::ALL {
                if rng.gen_bool(0.1) {
                    inputs.set(slot, directions[rng.gen_range(0..3)]);
                }
            }
            let sessions = if rng.gen_bool(0.01) { 1 } else { 2 };
            let (next, _) = state.step(&inputs, sessions, DT);

            for slot in Slot::ALL {
                let y = next.paddle_y(slot);
                assert!((top..=bottom).contains(&y), "paddle out of bounds: {}", y);
            }
            if next.started {
                assert_approx_eq!(next.ball.speed(), BALL_SPEED, 1e-3);
                assert!(next.time_remaining <= state.time_remaining);
            } else {
                assert_eq!(next.ball.velocity, Vector2::ZERO);
            }
            assert!(next.score1 >= state.score1);
            assert!(next.score2 >= state.score2);
            assert!(!next.ball.escaped());

            state = next;
        }
    }

    #[test]
    fn test_input_overwrite_keeps_latest() {
        let mut inputs = PlayerInputs::default();
        inputs.set(Slot::Player2, Direction::Up);
        inputs.set(Slot::Player2, Direction::Down);
        assert_eq!(inputs.get(Slot::Player2), Direction::Down);
        inputs.clear(Slot::Player2);
        assert_eq!(inputs.get(Slot::Player2), Direction::Still);
        assert_eq!(inputs.get(Slot::Player1), Direction::Still);
    }

    #[test]
    fn test_to_message_mirrors_state() {
        let mut state = running_state();
        state.score2 = 4;
        let message = state.to_message();
        assert_eq!(message.ball_x, state.ball.position.x);
        assert_eq!(message.ball_vx, BALL_SPEED);
        assert_eq!(message.score2, 4);
        assert!(message.started);
        assert!(!message.over);
    }
}
