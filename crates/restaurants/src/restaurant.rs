use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tablefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Email, UserId};
use tablefront_events::Event;

/// Restaurant identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RestaurantId(pub AggregateId);

impl RestaurantId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for RestaurantId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::str::FromStr for RestaurantId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Approval status, owned by platform admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RestaurantStatus {
    Pending,
    Approved,
    Blocked,
}

impl RestaurantStatus {
    pub const ALL: [RestaurantStatus; 3] = [
        RestaurantStatus::Pending,
        RestaurantStatus::Approved,
        RestaurantStatus::Blocked,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RestaurantStatus::Pending => "PENDING",
            RestaurantStatus::Approved => "APPROVED",
            RestaurantStatus::Blocked => "BLOCKED",
        }
    }
}

impl core::fmt::Display for RestaurantStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RestaurantStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RestaurantStatus::Pending),
            "APPROVED" => Ok(RestaurantStatus::Approved),
            "BLOCKED" => Ok(RestaurantStatus::Blocked),
            other => Err(DomainError::validation(format!(
                "unknown restaurant status '{other}'"
            ))),
        }
    }
}

pub const MAX_RATING: f32 = 5.0;

/// Aggregate root: Restaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    id: RestaurantId,
    owner_id: Option<UserId>,
    name: String,
    email: Option<Email>,
    address: String,
    phone: Option<String>,
    cuisine_type: Option<String>,
    rating: f32,
    status: RestaurantStatus,
    is_open: bool,
    is_active: bool,
    blocked_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

/// Proof that a restaurant passed the order-acceptance gate.
///
/// Only `Restaurant::accepting_orders` can build one, so an order cannot be
/// created for a restaurant that was not checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptingRestaurant {
    restaurant_id: RestaurantId,
    owner_id: UserId,
    name: String,
}

impl AcceptingRestaurant {
    pub fn restaurant_id(&self) -> RestaurantId {
        self.restaurant_id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Restaurant {
    pub const AGGREGATE_TYPE: &'static str = "restaurants.restaurant";

    /// Create an empty, not-yet-registered aggregate instance.
    pub fn empty(id: RestaurantId) -> Self {
        Self {
            id,
            owner_id: None,
            name: String::new(),
            email: None,
            address: String::new(),
            phone: None,
            cuisine_type: None,
            rating: 0.0,
            status: RestaurantStatus::Pending,
            is_open: false,
            is_active: false,
            blocked_reason: None,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> RestaurantId {
        self.id
    }

    pub fn owner_id(&self) -> Option<UserId> {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn cuisine_type(&self) -> Option<&str> {
        self.cuisine_type.as_deref()
    }

    pub fn rating(&self) -> f32 {
        self.rating
    }

    pub fn status(&self) -> RestaurantStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn blocked_reason(&self) -> Option<&str> {
        self.blocked_reason.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    pub fn is_registered(&self) -> bool {
        self.created
    }

    pub fn can_accept_orders(&self) -> bool {
        self.created && self.is_active && self.is_open && self.status == RestaurantStatus::Approved
    }

    /// Check the order-acceptance gate and hand out the proof on success.
    pub fn accepting_orders(&self) -> Result<AcceptingRestaurant, DomainError> {
        let owner_id = match self.owner_id {
            Some(owner_id) if self.can_accept_orders() => owner_id,
            _ => {
                return Err(DomainError::validation(format!(
                    "restaurant {} is not accepting orders (status {}, open {}, active {})",
                    self.id, self.status, self.is_open, self.is_active
                )));
            }
        };

        Ok(AcceptingRestaurant {
            restaurant_id: self.id,
            owner_id,
            name: self.name.clone(),
        })
    }
}

impl AggregateRoot for Restaurant {
    type Id = RestaurantId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterRestaurant (owner self-registration).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRestaurant {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: Option<String>,
    pub cuisine_type: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ApproveRestaurant (admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveRestaurant {
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: BlockRestaurant (admin).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRestaurant {
    pub restaurant_id: RestaurantId,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: OpenRestaurant (owner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRestaurant {
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CloseRestaurant (owner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseRestaurant {
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateRestaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateRestaurant {
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ReactivateRestaurant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactivateRestaurant {
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RateRestaurant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRestaurant {
    pub restaurant_id: RestaurantId,
    pub rating: f32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RestaurantCommand {
    RegisterRestaurant(RegisterRestaurant),
    ApproveRestaurant(ApproveRestaurant),
    BlockRestaurant(BlockRestaurant),
    OpenRestaurant(OpenRestaurant),
    CloseRestaurant(CloseRestaurant),
    DeactivateRestaurant(DeactivateRestaurant),
    ReactivateRestaurant(ReactivateRestaurant),
    RateRestaurant(RateRestaurant),
}

/// Event: RestaurantRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantRegistered {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub name: String,
    pub email: Email,
    pub address: String,
    pub phone: Option<String>,
    pub cuisine_type: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RestaurantApproved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantApproved {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub previous_status: RestaurantStatus,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RestaurantBlocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantBlocked {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub previous_status: RestaurantStatus,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RestaurantOpened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantOpened {
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RestaurantClosed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantClosed {
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RestaurantDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantDeactivated {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RestaurantReactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantReactivated {
    pub restaurant_id: RestaurantId,
    pub owner_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: RestaurantRated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRated {
    pub restaurant_id: RestaurantId,
    pub rating: f32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RestaurantEvent {
    RestaurantRegistered(RestaurantRegistered),
    RestaurantApproved(RestaurantApproved),
    RestaurantBlocked(RestaurantBlocked),
    RestaurantOpened(RestaurantOpened),
    RestaurantClosed(RestaurantClosed),
    RestaurantDeactivated(RestaurantDeactivated),
    RestaurantReactivated(RestaurantReactivated),
    RestaurantRated(RestaurantRated),
}

impl Event for RestaurantEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RestaurantEvent::RestaurantRegistered(_) => "restaurants.restaurant.registered",
            RestaurantEvent::RestaurantApproved(_) => "restaurants.restaurant.approved",
            RestaurantEvent::RestaurantBlocked(_) => "restaurants.restaurant.blocked",
            RestaurantEvent::RestaurantOpened(_) => "restaurants.restaurant.opened",
            RestaurantEvent::RestaurantClosed(_) => "restaurants.restaurant.closed",
            RestaurantEvent::RestaurantDeactivated(_) => "restaurants.restaurant.deactivated",
            RestaurantEvent::RestaurantReactivated(_) => "restaurants.restaurant.reactivated",
            RestaurantEvent::RestaurantRated(_) => "restaurants.restaurant.rated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            RestaurantEvent::RestaurantRegistered(e) => e.occurred_at,
            RestaurantEvent::RestaurantApproved(e) => e.occurred_at,
            RestaurantEvent::RestaurantBlocked(e) => e.occurred_at,
            RestaurantEvent::RestaurantOpened(e) => e.occurred_at,
            RestaurantEvent::RestaurantClosed(e) => e.occurred_at,
            RestaurantEvent::RestaurantDeactivated(e) => e.occurred_at,
            RestaurantEvent::RestaurantReactivated(e) => e.occurred_at,
            RestaurantEvent::RestaurantRated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Restaurant {
    type Command = RestaurantCommand;
    type Event = RestaurantEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            RestaurantEvent::RestaurantRegistered(e) => {
                self.id = e.restaurant_id;
                self.owner_id = Some(e.owner_id);
                self.name = e.name.clone();
                self.email = Some(e.email.clone());
                self.address = e.address.clone();
                self.phone = e.phone.clone();
                self.cuisine_type = e.cuisine_type.clone();
                self.rating = 0.0;
                self.status = RestaurantStatus::Pending;
                self.is_open = false;
                self.is_active = true;
                self.blocked_reason = None;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            RestaurantEvent::RestaurantApproved(_) => {
                self.status = RestaurantStatus::Approved;
                self.blocked_reason = None;
            }
            RestaurantEvent::RestaurantBlocked(e) => {
                self.status = RestaurantStatus::Blocked;
                self.blocked_reason = Some(e.reason.clone());
                self.is_open = false;
            }
            RestaurantEvent::RestaurantOpened(_) => {
                self.is_open = true;
            }
            RestaurantEvent::RestaurantClosed(_) => {
                self.is_open = false;
            }
            RestaurantEvent::RestaurantDeactivated(_) => {
                self.is_active = false;
                self.is_open = false;
            }
            RestaurantEvent::RestaurantReactivated(_) => {
                self.is_active = true;
            }
            RestaurantEvent::RestaurantRated(e) => {
                self.rating = e.rating;
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            RestaurantCommand::RegisterRestaurant(cmd) => self.handle_register(cmd),
            RestaurantCommand::ApproveRestaurant(cmd) => self.handle_approve(cmd),
            RestaurantCommand::BlockRestaurant(cmd) => self.handle_block(cmd),
            RestaurantCommand::OpenRestaurant(cmd) => self.handle_open(cmd),
            RestaurantCommand::CloseRestaurant(cmd) => self.handle_close(cmd),
            RestaurantCommand::DeactivateRestaurant(cmd) => self.handle_deactivate(cmd),
            RestaurantCommand::ReactivateRestaurant(cmd) => self.handle_reactivate(cmd),
            RestaurantCommand::RateRestaurant(cmd) => self.handle_rate(cmd),
        }
    }
}

impl Restaurant {
    fn ensure_registered(&self, restaurant_id: RestaurantId) -> Result<UserId, DomainError> {
        let owner_id = match self.owner_id {
            Some(owner_id) if self.created => owner_id,
            _ => return Err(DomainError::not_found()),
        };
        if self.id != restaurant_id {
            return Err(DomainError::validation("restaurant_id mismatch"));
        }
        Ok(owner_id)
    }

    fn handle_register(
        &self,
        cmd: &RegisterRestaurant,
    ) -> Result<Vec<RestaurantEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invalid_state("restaurant already registered"));
        }

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("restaurant name must not be empty"));
        }
        let address = cmd.address.trim();
        if address.is_empty() {
            return Err(DomainError::validation("restaurant address must not be empty"));
        }
        let email = Email::parse(&cmd.email)?;

        Ok(vec![RestaurantEvent::RestaurantRegistered(RestaurantRegistered {
            restaurant_id: cmd.restaurant_id,
            owner_id: cmd.owner_id,
            name: name.to_string(),
            email,
            address: address.to_string(),
            phone: non_blank(&cmd.phone),
            cuisine_type: non_blank(&cmd.cuisine_type),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_approve(&self, cmd: &ApproveRestaurant) -> Result<Vec<RestaurantEvent>, DomainError> {
        let owner_id = self.ensure_registered(cmd.restaurant_id)?;

        if self.status == RestaurantStatus::Approved {
            return Err(DomainError::invalid_state("restaurant is already approved"));
        }

        Ok(vec![RestaurantEvent::RestaurantApproved(RestaurantApproved {
            restaurant_id: cmd.restaurant_id,
            owner_id,
            previous_status: self.status,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_block(&self, cmd: &BlockRestaurant) -> Result<Vec<RestaurantEvent>, DomainError> {
        let owner_id = self.ensure_registered(cmd.restaurant_id)?;

        if self.status == RestaurantStatus::Blocked {
            return Err(DomainError::invalid_state("restaurant is already blocked"));
        }
        let reason = cmd.reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("a block reason is required"));
        }

        Ok(vec![RestaurantEvent::RestaurantBlocked(RestaurantBlocked {
            restaurant_id: cmd.restaurant_id,
            owner_id,
            previous_status: self.status,
            reason: reason.to_string(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_open(&self, cmd: &OpenRestaurant) -> Result<Vec<RestaurantEvent>, DomainError> {
        self.ensure_registered(cmd.restaurant_id)?;

        if !self.is_active {
            return Err(DomainError::invalid_state("cannot open an inactive restaurant"));
        }
        if self.status != RestaurantStatus::Approved {
            return Err(DomainError::invalid_state(format!(
                "cannot open a restaurant that is {}",
                self.status
            )));
        }
        if self.is_open {
            return Err(DomainError::invalid_state("restaurant is already open"));
        }

        Ok(vec![RestaurantEvent::RestaurantOpened(RestaurantOpened {
            restaurant_id: cmd.restaurant_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_close(&self, cmd: &CloseRestaurant) -> Result<Vec<RestaurantEvent>, DomainError> {
        self.ensure_registered(cmd.restaurant_id)?;

        if !self.is_open {
            return Err(DomainError::invalid_state("restaurant is already closed"));
        }

        Ok(vec![RestaurantEvent::RestaurantClosed(RestaurantClosed {
            restaurant_id: cmd.restaurant_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(
        &self,
        cmd: &DeactivateRestaurant,
    ) -> Result<Vec<RestaurantEvent>, DomainError> {
        let owner_id = self.ensure_registered(cmd.restaurant_id)?;

        if !self.is_active {
            return Err(DomainError::invalid_state("restaurant is already inactive"));
        }

        Ok(vec![RestaurantEvent::RestaurantDeactivated(RestaurantDeactivated {
            restaurant_id: cmd.restaurant_id,
            owner_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_reactivate(
        &self,
        cmd: &ReactivateRestaurant,
    ) -> Result<Vec<RestaurantEvent>, DomainError> {
        let owner_id = self.ensure_registered(cmd.restaurant_id)?;

        if self.is_active {
            return Err(DomainError::invalid_state("restaurant is already active"));
        }

        Ok(vec![RestaurantEvent::RestaurantReactivated(RestaurantReactivated {
            restaurant_id: cmd.restaurant_id,
            owner_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rate(&self, cmd: &RateRestaurant) -> Result<Vec<RestaurantEvent>, DomainError> {
        self.ensure_registered(cmd.restaurant_id)?;

        if !cmd.rating.is_finite() || !(0.0..=MAX_RATING).contains(&cmd.rating) {
            return Err(DomainError::validation(format!(
                "rating must be between 0 and {MAX_RATING}, got {}",
                cmd.rating
            )));
        }

        Ok(vec![RestaurantEvent::RestaurantRated(RestaurantRated {
            restaurant_id: cmd.restaurant_id,
            rating: cmd.rating,
            occurred_at: cmd.occurred_at,
        })])
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
