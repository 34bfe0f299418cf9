//! Calendar service
//!
//! Shared handle over the store used by the API layer. Runs validation and
//! store operations in the order the HTTP contract requires.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::info;

use crate::event::{CreateEventRequest, Event, EventAction, UpdateEventRequest};
use crate::store::CalendarStore;
use crate::user::User;
use crate::{Error, Result};

/// A successful event write together with the user who owns the event
#[derive(Debug, Clone)]
pub struct EventChange {
    pub event: Event,
    pub owner: User,
    pub action: EventAction,
}

/// Thread-safe calendar service
#[derive(Clone)]
pub struct CalendarService {
    store: Arc<Mutex<CalendarStore>>,
}

impl CalendarService {
    /// Wrap an opened store
    pub fn new(store: CalendarStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Open the store at the given database path
    pub fn open(db_path: &str) -> Result<Self> {
        Ok(Self::new(CalendarStore::new(db_path)?))
    }

    /// Create an in-memory service (for testing)
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(CalendarStore::in_memory()?))
    }

    fn lock(&self) -> Result<MutexGuard<'_, CalendarStore>> {
        self.store
            .lock()
            .map_err(|_| Error::Other("Calendar store lock poisoned".to_string()))
    }

    /// Make sure the configured users exist
    pub fn seed_users(&self, names: &[String]) -> Result<Vec<User>> {
        let users = self.lock()?.seed_users(names)?;
        info!("User directory has {} users", users.len());
        Ok(users)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.lock()?.list_users()
    }

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.lock()?.get_user(id)?.ok_or(Error::UserNotFound)
    }

    /// Look a user up by name, ignoring case
    pub fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.lock()?.find_user_by_name(name)
    }

    /// All events ordered by start date
    pub fn list_events(&self) -> Result<Vec<Event>> {
        self.lock()?.list_events()
    }

    pub fn get_event(&self, id: i64) -> Result<Event> {
        self.lock()?.get_event(id)?.ok_or(Error::EventNotFound)
    }

    /// Validate and store a new event
    pub fn create_event(&self, request: CreateEventRequest) -> Result<EventChange> {
        let new_event = request.validate()?;

        let event = self.lock()?.create_event(&new_event)?;
        let owner = self.get_user(event.user_id)?;

        info!("Event {} created by {}", event.id, owner.name);
        Ok(EventChange {
            event,
            owner,
            action: EventAction::Created,
        })
    }

    /// Validate and apply a partial update.
    ///
    /// A missing event is reported before any validation error.
    pub fn update_event(&self, id: i64, request: UpdateEventRequest) -> Result<EventChange> {
        let event = {
            let mut store = self.lock()?;
            if store.get_event(id)?.is_none() {
                return Err(Error::EventNotFound);
            }

            let patch = request.validate()?;
            store.update_event(id, &patch)?
        };
        let owner = self.get_user(event.user_id)?;

        info!("Event {} updated by {}", event.id, owner.name);
        Ok(EventChange {
            event,
            owner,
            action: EventAction::Updated,
        })
    }

    pub fn delete_event(&self, id: i64) -> Result<()> {
        self.lock()?.delete_event(id)?;
        info!("Event {} deleted", id);
        Ok(())
    }

    /// Count stored events
    pub fn count_events(&self) -> Result<usize> {
        self.lock()?.count_events()
    }
}
