//! Wall clock

use crate::core::traits::Clock;
use chrono::{DateTime, Utc};
use di::{inject, injectable};

pub struct SystemClock;

#[injectable(Clock)]
impl SystemClock {
    #[inject]
    pub fn create() -> SystemClock {
        SystemClock
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
