//! Pure writing-round state.

pub mod round;
