//! Use cases of the sharing service. Handlers translate HTTP into calls on [`ShareItService`],
//! the service applies the booking rules and talks to the injected repository.

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::clock::Clock;
use crate::error::{ShareItError, ShareItResult};
use crate::repository::ShareItRepository;

mod bookings;
mod items;
mod requests;
mod users;

#[derive(Clone)]
pub struct ShareItService {
    repository: Arc<dyn ShareItRepository>,
    clock: Arc<dyn Clock>,
}

impl ShareItService {
    pub fn new(repository: Arc<dyn ShareItRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }
}

fn require_non_blank(field: &str, value: &str) -> ShareItResult<()> {
    if value.trim().is_empty() {
        return Err(ShareItError::Validation(format!("{field} must not be blank")));
    }
    Ok(())
}
