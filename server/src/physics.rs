//! Ball and paddle geometry for the arena.
//!
//! Positions are box centers in screen coordinates (y grows downwards).
//! Velocities are expressed in pixels per tick; there is no sub-stepping, so
//! a fast enough ball can tunnel through thin geometry.

use shared::{
    BALL_SIZE, BALL_SPEED, FIELD_BOTTOM, FIELD_CENTER_X, FIELD_CENTER_Y, FIELD_TOP,
    GOAL_BAR_LENGTH, GOAL_HEIGHT, GOAL_INSET, GOAL_THICKNESS, GOAL_Y, PADDLE_HEIGHT,
    PADDLE_WIDTH, WIDTH,
};
use std::f32::consts::FRAC_PI_4;

const HALF_BALL: f32 = BALL_SIZE / 2.0;
const HALF_THICKNESS: f32 = GOAL_THICKNESS / 2.0;

///Represents a vector in 2D space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    ///Value along the x-axis.
    /// Positive direction is to the right.
    pub x: f32,
    ///Value along the y-axis.
    /// Positive direction is down.
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    ///Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    ///Returns the sum of two vectors.
    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

///Axis-aligned box described by its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub center: Vector2,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn left(&self) -> f32 {
        self.center.x - self.width / 2.0
    }

    pub fn right(&self) -> f32 {
        self.center.x + self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center.y - self.height / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.center.y + self.height / 2.0
    }

    ///Inclusive AABB intersection: touching edges count as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.left() <= other.right()
            && self.right() >= other.left()
            && self.top() <= other.bottom()
            && self.bottom() >= other.top()
    }
}

/// Which side wall a goal is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Box occupied by a paddle whose center is `(x, y)`.
pub fn paddle_rect(x: f32, y: f32) -> Rect {
    Rect {
        center: Vector2 { x, y },
        width: PADDLE_WIDTH,
        height: PADDLE_HEIGHT,
    }
}

/// Keeps a paddle center inside the playable field.
pub fn clamp_paddle(y: f32) -> f32 {
    y.clamp(
        FIELD_TOP + PADDLE_HEIGHT / 2.0,
        FIELD_BOTTOM - PADDLE_HEIGHT / 2.0,
    )
}

fn in_goal_window(y: f32) -> bool {
    (GOAL_Y..=GOAL_Y + GOAL_HEIGHT).contains(&y)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ball {
    pub position: Vector2,
    pub velocity: Vector2,
}

impl Ball {
    /// Resting at the field center, as before the first serve.
    pub fn idle() -> Self {
        Ball {
            position: Vector2 {
                x: FIELD_CENTER_X,
                y: FIELD_CENTER_Y,
            },
            velocity: Vector2::ZERO,
        }
    }

    /// At the field center heading right at full speed.
    pub fn serve() -> Self {
        Ball {
            velocity: Vector2 {
                x: BALL_SPEED,
                y: 0.0,
            },
            ..Ball::idle()
        }
    }

    pub fn at(x: f32, y: f32, vx: f32, vy: f32) -> Self {
        Ball {
            position: Vector2 { x, y },
            velocity: Vector2 { x: vx, y: vy },
        }
    }

    pub fn rect(&self) -> Rect {
        Rect {
            center: self.position,
            width: BALL_SIZE,
            height: BALL_SIZE,
        }
    }

    pub fn speed(&self) -> f32 {
        self.velocity.magnitude()
    }

    pub fn stop(&mut self) {
        self.velocity = Vector2::ZERO;
    }

    /// Advances one tick along the current velocity.
    pub fn integrate(&mut self) {
        self.position = self.position.add(&self.velocity);
    }

    /// Reflects off the top of the field and the floor. Returns true on contact.
    pub fn bounce_off_walls(&mut self) -> bool {
        if self.position.y <= FIELD_TOP + HALF_BALL {
            self.velocity.y = self.velocity.y.abs();
            self.position.y = FIELD_TOP + HALF_BALL;
            true
        } else if self.position.y >= FIELD_BOTTOM - HALF_BALL {
            self.velocity.y = -self.velocity.y.abs();
            self.position.y = FIELD_BOTTOM - HALF_BALL;
            true
        } else {
            false
        }
    }

    /// Goal whose mouth the ball has entered, if any.
    ///
    /// The ball's leading edge must reach the goal's inset threshold while its
    /// center lies inside the scoring window.
    pub fn goal_entered(&self) -> Option<Side> {
        if !in_goal_window(self.position.y) {
            return None;
        }
        if self.position.x - HALF_BALL <= GOAL_INSET {
            Some(Side::Left)
        } else if self.position.x + HALF_BALL >= WIDTH - GOAL_INSET {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Bounces off the posts and bars of both "C" goals. Returns true on contact.
    ///
    /// Posts reflect the horizontal component outside the scoring window,
    /// bars reflect the vertical component. The ball is placed flush against
    /// whatever it hit so it cannot sink into the frame.
    pub fn bounce_off_goal_frames(&mut self) -> bool {
        let mut hit = false;
        let outside_window = !in_goal_window(self.position.y);

        if outside_window && self.position.x - HALF_BALL <= GOAL_INSET + HALF_THICKNESS {
            self.velocity.x = self.velocity.x.abs();
            self.position.x = GOAL_INSET + HALF_THICKNESS + HALF_BALL;
            hit = true;
        }
        if outside_window && self.position.x + HALF_BALL >= WIDTH - GOAL_INSET - HALF_THICKNESS {
            self.velocity.x = -self.velocity.x.abs();
            self.position.x = WIDTH - GOAL_INSET - HALF_THICKNESS - HALF_BALL;
            hit = true;
        }

        let left_span = GOAL_INSET - HALF_THICKNESS..=GOAL_INSET + GOAL_BAR_LENGTH + HALF_THICKNESS;
        let right_span = WIDTH - GOAL_INSET - GOAL_BAR_LENGTH - HALF_THICKNESS
            ..=WIDTH - GOAL_INSET + HALF_THICKNESS;
        if left_span.contains(&self.position.x) || right_span.contains(&self.position.x) {
            for bar_y in [GOAL_Y, GOAL_Y + GOAL_HEIGHT] {
                hit |= self.bounce_off_bar(bar_y);
            }
        }

        hit
    }

    fn bounce_off_bar(&mut self, bar_y: f32) -> bool {
        let reach = HALF_THICKNESS + HALF_BALL;
        if (self.position.y - bar_y).abs() > reach {
            return false;
        }
        if self.position.y <= bar_y {
            self.velocity.y = -self.velocity.y.abs();
            self.position.y = bar_y - reach;
        } else {
            self.velocity.y = self.velocity.y.abs();
            self.position.y = bar_y + reach;
        }
        true
    }

    /// Deflects off a paddle centered at `paddle`. Returns true on contact.
    ///
    /// The impact offset from the paddle center, normalized by the paddle's
    /// half height, maps linearly onto a bounce angle of at most 45 degrees.
    /// The horizontal direction is reversed and the ball is placed flush
    /// against the paddle face it leaves from.
    pub fn bounce_off_paddle(&mut self, paddle: Vector2) -> bool {
        let paddle_box = paddle_rect(paddle.x, paddle.y);
        if !self.rect().overlaps(&paddle_box) {
            return false;
        }

        let offset = ((self.position.y - paddle.y) / (PADDLE_HEIGHT / 2.0)).clamp(-1.0, 1.0);
        let angle = offset * FRAC_PI_4;
        let away = if self.velocity.x > 0.0 {
            -1.0
        } else if self.velocity.x < 0.0 || self.position.x >= paddle.x {
            1.0
        } else {
            -1.0
        };

        self.velocity = Vector2 {
            x: BALL_SPEED * angle.cos() * away,
            y: BALL_SPEED * angle.sin(),
        };
        self.position.x = paddle.x + away * (PADDLE_WIDTH / 2.0 + HALF_BALL);
        true
    }

    /// True once the ball has left the window horizontally by more than its
    /// own size, which only a physics bug can cause.
    pub fn escaped(&self) -> bool {
        self.position.x < -BALL_SIZE || self.position.x > WIDTH + BALL_SIZE
    }
}
