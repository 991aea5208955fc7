use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tablefront_core::{Aggregate, AggregateRoot, DomainError, Email, UserId};
use tablefront_events::Event;
use tablefront_restaurants::RestaurantId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    RestaurantOwner,
    Admin,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::RestaurantOwner => "restaurant_owner",
            UserRole::Admin => "admin",
        }
    }
}

impl core::fmt::Display for UserRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(UserRole::Customer),
            "restaurant_owner" | "owner" => Ok(UserRole::RestaurantOwner),
            "admin" => Ok(UserRole::Admin),
            other => Err(DomainError::validation(format!("unknown role '{other}'"))),
        }
    }
}

/// Aggregate root: User.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: Option<Email>,
    full_name: String,
    phone: Option<String>,
    role: UserRole,
    is_active: bool,
    /// Insertion-ordered, no duplicates.
    favorites: Vec<RestaurantId>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl User {
    pub const AGGREGATE_TYPE: &'static str = "accounts.user";

    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            email: None,
            full_name: String::new(),
            phone: None,
            role: UserRole::Customer,
            is_active: false,
            favorites: Vec::new(),
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn favorites(&self) -> &[RestaurantId] {
        &self.favorites
    }

    pub fn is_favorite(&self, restaurant_id: RestaurantId) -> bool {
        self.favorites.contains(&restaurant_id)
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

    /// Deactivated or unknown users may not place orders.
    pub fn ensure_can_order(&self) -> Result<(), DomainError> {
        if !self.created || !self.is_active {
            return Err(DomainError::validation(format!(
                "user {} is not allowed to place orders",
                self.id
            )));
        }
        Ok(())
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterUser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeactivateUser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeactivateUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddFavorite (idempotent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddFavorite {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveFavorite (idempotent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFavorite {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    RegisterUser(RegisterUser),
    DeactivateUser(DeactivateUser),
    AddFavorite(AddFavorite),
    RemoveFavorite(RemoveFavorite),
}

/// Event: UserRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub email: Email,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub occurred_at: DateTime<Utc>,
}

/// Event: UserDeactivated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeactivated {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FavoriteAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteAdded {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FavoriteRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRemoved {
    pub user_id: UserId,
    pub restaurant_id: RestaurantId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    UserRegistered(UserRegistered),
    UserDeactivated(UserDeactivated),
    FavoriteAdded(FavoriteAdded),
    FavoriteRemoved(FavoriteRemoved),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered(_) => "accounts.user.registered",
            UserEvent::UserDeactivated(_) => "accounts.user.deactivated",
            UserEvent::FavoriteAdded(_) => "accounts.user.favorite_added",
            UserEvent::FavoriteRemoved(_) => "accounts.user.favorite_removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::UserRegistered(e) => e.occurred_at,
            UserEvent::UserDeactivated(e) => e.occurred_at,
            UserEvent::FavoriteAdded(e) => e.occurred_at,
            UserEvent::FavoriteRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::UserRegistered(e) => {
                self.id = e.user_id;
                self.email = Some(e.email.clone());
                self.full_name = e.full_name.clone();
                self.phone = e.phone.clone();
                self.role = e.role;
                self.is_active = true;
                self.favorites.clear();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            UserEvent::UserDeactivated(_) => {
                self.is_active = false;
            }
            UserEvent::FavoriteAdded(e) => {
                if !self.favorites.contains(&e.restaurant_id) {
                    self.favorites.push(e.restaurant_id);
                }
            }
            UserEvent::FavoriteRemoved(e) => {
                self.favorites.retain(|r| *r != e.restaurant_id);
            }
        }

        self.updated_at = Some(event.occurred_at());
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::RegisterUser(cmd) => self.handle_register(cmd),
            UserCommand::DeactivateUser(cmd) => self.handle_deactivate(cmd),
            UserCommand::AddFavorite(cmd) => self.handle_add_favorite(cmd),
            UserCommand::RemoveFavorite(cmd) => self.handle_remove_favorite(cmd),
        }
    }
}

impl User {
    fn ensure_active(&self, user_id: UserId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != user_id {
            return Err(DomainError::validation("user_id mismatch"));
        }
        if !self.is_active {
            return Err(DomainError::invalid_state("user is deactivated"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::invalid_state("user already registered"));
        }

        let email = Email::parse(&cmd.email)?;
        let full_name = cmd.full_name.trim();
        if full_name.is_empty() {
            return Err(DomainError::validation("full name must not be empty"));
        }

        Ok(vec![UserEvent::UserRegistered(UserRegistered {
            user_id: cmd.user_id,
            email,
            full_name: full_name.to_string(),
            phone: cmd
                .phone
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
            role: cmd.role,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_deactivate(&self, cmd: &DeactivateUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_active(cmd.user_id)?;

        Ok(vec![UserEvent::UserDeactivated(UserDeactivated {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_favorite(&self, cmd: &AddFavorite) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_active(cmd.user_id)?;

        if self.is_favorite(cmd.restaurant_id) {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::FavoriteAdded(FavoriteAdded {
            user_id: cmd.user_id,
            restaurant_id: cmd.restaurant_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_favorite(&self, cmd: &RemoveFavorite) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_active(cmd.user_id)?;

        if !self.is_favorite(cmd.restaurant_id) {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::FavoriteRemoved(FavoriteRemoved {
            user_id: cmd.user_id,
            restaurant_id: cmd.restaurant_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tablefront_core::AggregateId;

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn run(user: &mut User, cmd: UserCommand) -> Result<usize, DomainError> {
        let events = user.handle(&cmd)?;
        for ev in &events {
            user.apply(ev);
        }
        Ok(events.len())
    }

    fn registered() -> User {
        let user_id = UserId::new();
        let mut user = User::empty(user_id);
        run(
            &mut user,
            UserCommand::RegisterUser(RegisterUser {
                user_id,
                email: " Ana@Example.COM ".to_string(),
                full_name: "Ana Souza".to_string(),
                phone: None,
                role: UserRole::Customer,
                occurred_at: test_time(),
            }),
        )
        .unwrap();
        user
    }

    fn add_favorite(user: &mut User, restaurant_id: RestaurantId) -> Result<usize, DomainError> {
        let user_id = *user.id();
        run(
            user,
            UserCommand::AddFavorite(AddFavorite {
                user_id,
                restaurant_id,
                occurred_at: test_time(),
            }),
        )
    }

    fn remove_favorite(user: &mut User, restaurant_id: RestaurantId) -> Result<usize, DomainError> {
        let user_id = *user.id();
        run(
            user,
            UserCommand::RemoveFavorite(RemoveFavorite {
                user_id,
                restaurant_id,
                occurred_at: test_time(),
            }),
        )
    }

    fn deactivate(user: &mut User) -> Result<usize, DomainError> {
        let user_id = *user.id();
        run(
            user,
            UserCommand::DeactivateUser(DeactivateUser {
                user_id,
                occurred_at: test_time(),
            }),
        )
    }

    #[test]
    fn registration_normalizes_email() {
        let user = registered();
        assert_eq!(user.email().unwrap().as_str(), "ana@example.com");
        assert!(user.is_active());
        assert_eq!(user.version(), 1);
        assert!(user.ensure_can_order().is_ok());
    }

    #[test]
    fn registration_rejects_bad_email() {
        let user_id = UserId::new();
        let err = User::empty(user_id)
            .handle(&UserCommand::RegisterUser(RegisterUser {
                user_id,
                email: "ana.example.com".to_string(),
                full_name: "Ana".to_string(),
                phone: None,
                role: UserRole::Customer,
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn deactivated_user_cannot_order() {
        let mut user = registered();
        deactivate(&mut user).unwrap();

        assert!(matches!(user.ensure_can_order(), Err(DomainError::Validation(_))));
        assert!(matches!(deactivate(&mut user), Err(DomainError::InvalidState(_))));
    }

    #[test]
    fn favorites_are_idempotent_and_ordered() {
        let mut user = registered();
        let a = RestaurantId::new(AggregateId::new());
        let b = RestaurantId::new(AggregateId::new());

        assert_eq!(add_favorite(&mut user, a).unwrap(), 1);
        assert_eq!(add_favorite(&mut user, b).unwrap(), 1);
        assert_eq!(add_favorite(&mut user, a).unwrap(), 0);
        assert_eq!(user.favorites(), &[a, b]);

        assert_eq!(remove_favorite(&mut user, a).unwrap(), 1);
        assert_eq!(remove_favorite(&mut user, a).unwrap(), 0);
        assert_eq!(user.favorites(), &[b]);
        assert_eq!(user.version(), 4);
    }

    #[test]
    fn deactivated_user_cannot_change_favorites() {
        let mut user = registered();
        deactivate(&mut user).unwrap();
        let err = add_favorite(&mut user, RestaurantId::new(AggregateId::new())).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn role_parsing() {
        assert_eq!("Owner".parse::<UserRole>().unwrap(), UserRole::RestaurantOwner);
        assert!("chef".parse::<UserRole>().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            .. ProptestConfig::default()
        })]

        #[test]
        fn favorites_never_contain_duplicates(ops in prop::collection::vec((0usize..4, any::<bool>()), 0..40)) {
            let pool: Vec<RestaurantId> = (0..4).map(|_| RestaurantId::new(AggregateId::new())).collect();
            let mut user = registered();

            for (idx, add) in ops {
                if add {
                    add_favorite(&mut user, pool[idx]).unwrap();
                } else {
                    remove_favorite(&mut user, pool[idx]).unwrap();
                }
            }

            let mut seen = std::collections::HashSet::new();
            for r in user.favorites() {
                prop_assert!(seen.insert(*r));
            }
        }
    }
}
