use crate::{jwt::SessionData, schema::UserRole};

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::User,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageSubscriptions,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::ManageOwnFavorites,
            ActionType::ManageOwnCart,
            ActionType::ManageSubscriptions,
            ActionType::CreateTags,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,
    CreateTags,

    ManageOwnRecipes,
    ManageOwnFavorites,
    ManageOwnCart,
    ManageSubscriptions,
}

impl ActionType {
    pub fn authenticate(self, session: &SessionData) -> bool {
        let user_role = &session.user_role;

        ACTION_TABLE
            .iter()
            .find_map(|(role, actions)| {
                if user_role != role {
                    return None;
                }

                Some(actions.contains(&self))
            })
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: UserRole) -> SessionData {
        SessionData {
            user_id: 1,
            username: String::from("anna"),
            is_admin: role == UserRole::Admin,
            user_role: role,
        }
    }

    #[test]
    fn users_manage_their_own_content() {
        let user = session(UserRole::User);

        assert!(ActionType::CreateRecipes.authenticate(&user));
        assert!(ActionType::ManageOwnCart.authenticate(&user));
        assert!(ActionType::ManageSubscriptions.authenticate(&user));
        assert!(!ActionType::CreateTags.authenticate(&user));
    }

    #[test]
    fn admins_create_tags() {
        assert!(ActionType::CreateTags.authenticate(&session(UserRole::Admin)));
    }
}
