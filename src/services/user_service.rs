use crate::config::{AppConfig, DeletePolicy, PROFILE_PICTURE_MAX_BYTES};
use crate::database::{Database, Snapshot};
use crate::models::{ActivityInput, CreateUserRequest, Role, UpdateUserRequest, User, UserProfile};
use crate::services::auth_service::{self, Claims};
use crate::services::{relationship, upload_service};
use crate::utils::error::{AppError, AppResult};

fn user_not_found() -> AppError {
    AppError::not_found("User not found")
}

fn club_not_found() -> AppError {
    AppError::not_found("Club not found")
}

fn event_not_found() -> AppError {
    AppError::not_found("Event not found")
}

fn validate_username(raw: &str) -> AppResult<String> {
    let username = raw.trim();
    if username.is_empty() {
        return Err(AppError::bad_request("Username is required"));
    }
    if username.contains('/') || username.chars().any(char::is_control) {
        return Err(AppError::bad_request("Username contains invalid characters"));
    }
    Ok(username.to_string())
}

/// Only a superadmin hands out superadmin; any admin hands out the rest.
fn check_role_grant(actor: &Claims, role: Role) -> AppResult<()> {
    actor.require_admin()?;
    if role == Role::Superadmin && actor.role != Role::Superadmin {
        return Err(AppError::forbidden("Only a superadmin can grant the superadmin role"));
    }
    Ok(())
}

/// Accounts holding the superadmin role are only touched by another superadmin.
fn check_target(actor: &Claims, target: &User) -> AppResult<()> {
    if target.role == Role::Superadmin && actor.role != Role::Superadmin {
        return Err(AppError::forbidden("Only a superadmin can modify a superadmin account"));
    }
    Ok(())
}

pub async fn list_users(db: &Database) -> AppResult<Vec<UserProfile>> {
    Ok(db
        .load_all::<User>()
        .await?
        .iter()
        .map(UserProfile::from)
        .collect())
}

pub async fn get_user(db: &Database, username: &str) -> AppResult<UserProfile> {
    db.find::<User>(username)
        .await?
        .map(UserProfile::from)
        .ok_or_else(user_not_found)
}

/// Inserts a user whose password is already hashed.
pub async fn insert_user(db: &Database, user: User) -> AppResult<UserProfile> {
    db.transact::<User, _, _>(move |users| {
        if users.iter().any(|u| u.username == user.username) {
            return Err(AppError::conflict("User already exists"));
        }
        let profile = UserProfile::from(&user);
        users.push(user);
        Ok(profile)
    })
    .await
}

pub async fn create_user(
    db: &Database,
    config: &AppConfig,
    actor: &Claims,
    request: CreateUserRequest,
) -> AppResult<UserProfile> {
    let role = match request.role {
        Some(role) if !request.username.trim().is_empty() && !request.password.is_empty() => role,
        _ => return Err(AppError::bad_request("All fields are required")),
    };
    check_role_grant(actor, role)?;
    let username = validate_username(&request.username)?;

    let hashed = auth_service::hash_password(&request.password, config.auth.bcrypt_cost).await?;
    let profile = insert_user(db, User::new(username, hashed, role)).await?;

    log::info!(
        "✅ User created: {} ({}) by {}",
        profile.username,
        role.as_str(),
        actor.username()
    );
    Ok(profile)
}

/// Rewrites every reference to `from` held by clubs and events.
///
/// Membership sets may already hold `to` (an orphaned reference left by a
/// deleted account of that name), so the entry is moved rather than rewritten.
fn rename_references(snap: &mut Snapshot, from: &str, to: &str) {
    for club in snap.clubs.iter_mut() {
        if relationship::mirror_remove(&mut club.members, from) {
            relationship::mirror_insert(&mut club.members, to);
        }
        if club.created_by == from {
            club.created_by = to.to_string();
        }
    }
    for event in snap.events.iter_mut() {
        if relationship::mirror_remove(&mut event.attendees, from) {
            relationship::mirror_insert(&mut event.attendees, to);
        }
        if event.created_by == from {
            event.created_by = to.to_string();
        }
        if event.updated_by.as_deref() == Some(from) {
            event.updated_by = Some(to.to_string());
        }
    }
}

pub async fn update_user(
    db: &Database,
    config: &AppConfig,
    actor: &Claims,
    username: &str,
    request: UpdateUserRequest,
) -> AppResult<UserProfile> {
    actor.require_self_or_admin(username)?;
    if let Some(role) = request.role {
        check_role_grant(actor, role)?;
    }

    let new_username = match request.username.as_deref() {
        Some(raw) => Some(validate_username(raw)?).filter(|name| name != username),
        None => None,
    };

    let new_password = match request.password.as_deref() {
        Some(pw) if !pw.is_empty() => {
            Some(auth_service::hash_password(pw, config.auth.bcrypt_cost).await?)
        }
        _ => None,
    };

    db.transact_all(move |snap| {
        if let Some(target) = new_username.as_deref() {
            if snap.users.iter().any(|u| u.username == target) {
                return Err(AppError::conflict("User already exists"));
            }
        }

        let profile = {
            let user = snap.user_mut(username).ok_or_else(user_not_found)?;
            check_target(actor, user)?;

            if let Some(bio) = request.bio {
                user.bio = bio;
            }
            if let Some(hash) = new_password {
                user.password = hash;
            }
            if let Some(role) = request.role {
                user.role = role;
            }
            if let Some(activity) = request.recent_activity {
                relationship::push_activity(user, activity);
            }
            if let Some(target) = new_username.as_deref() {
                user.username = target.to_string();
            }
            UserProfile::from(&*user)
        };

        if let Some(target) = new_username.as_deref() {
            rename_references(snap, username, target);
            log::info!("✏️  Renamed user {} -> {}", username, target);
        }

        Ok(profile)
    })
    .await
}

pub async fn delete_user(
    db: &Database,
    config: &AppConfig,
    actor: &Claims,
    username: &str,
) -> AppResult<()> {
    actor.require_self_or_admin(username)?;
    let policy = config.delete_policy;

    let removed = db
        .transact_all(move |snap| {
            let index = snap
                .users
                .iter()
                .position(|u| u.username == username)
                .ok_or_else(user_not_found)?;
            check_target(actor, &snap.users[index])?;
            let removed = snap.users.remove(index);

            if policy == DeletePolicy::Cascade {
                for club in snap.clubs.iter_mut() {
                    relationship::mirror_remove(&mut club.members, username);
                }
                for event in snap.events.iter_mut() {
                    relationship::mirror_remove(&mut event.attendees, username);
                }
            }
            Ok(removed)
        })
        .await?;

    if let Some(picture) = removed.profile_picture.as_deref() {
        upload_service::discard_public(&config.upload_dir, picture).await;
    }

    log::info!("🗑️  User deleted: {} by {}", username, actor.username());
    Ok(())
}

pub async fn join_club(
    db: &Database,
    actor: &Claims,
    username: &str,
    club_id: &str,
) -> AppResult<UserProfile> {
    actor.require_self_or_admin(username)?;

    db.transact_all(|snap| {
        let club = snap
            .clubs
            .iter_mut()
            .find(|c| c.id == club_id)
            .ok_or_else(club_not_found)?;
        let user = snap
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(user_not_found)?;

        relationship::join_club(user, club_id)?;
        relationship::mirror_insert(&mut club.members, username);
        Ok(UserProfile::from(&*user))
    })
    .await
}

pub async fn leave_club(
    db: &Database,
    actor: &Claims,
    username: &str,
    club_id: &str,
) -> AppResult<UserProfile> {
    actor.require_self_or_admin(username)?;

    db.transact_all(|snap| {
        let user = snap
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(user_not_found)?;

        relationship::leave_club(user, club_id)?;
        // the club may already be gone (orphaned reference); leaving still succeeds
        if let Some(club) = snap.clubs.iter_mut().find(|c| c.id == club_id) {
            relationship::mirror_remove(&mut club.members, username);
        }
        Ok(UserProfile::from(&*user))
    })
    .await
}

pub async fn join_event(
    db: &Database,
    actor: &Claims,
    username: &str,
    event_id: &str,
) -> AppResult<UserProfile> {
    actor.require_self_or_admin(username)?;

    db.transact_all(|snap| {
        let event = snap
            .events
            .iter_mut()
            .find(|e| e.id == event_id)
            .ok_or_else(event_not_found)?;
        let user = snap
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(user_not_found)?;

        relationship::join_event(user, event_id)?;
        relationship::mirror_insert(&mut event.attendees, username);
        Ok(UserProfile::from(&*user))
    })
    .await
}

pub async fn leave_event(
    db: &Database,
    actor: &Claims,
    username: &str,
    event_id: &str,
) -> AppResult<UserProfile> {
    actor.require_self_or_admin(username)?;

    db.transact_all(|snap| {
        let user = snap
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(user_not_found)?;

        relationship::leave_event(user, event_id)?;
        if let Some(event) = snap.events.iter_mut().find(|e| e.id == event_id) {
            relationship::mirror_remove(&mut event.attendees, username);
        }
        Ok(UserProfile::from(&*user))
    })
    .await
}

pub async fn record_activity(
    db: &Database,
    actor: &Claims,
    username: &str,
    input: ActivityInput,
) -> AppResult<UserProfile> {
    actor.require_self_or_admin(username)?;
    if input.action.trim().is_empty() {
        return Err(AppError::bad_request("Activity action is required"));
    }

    db.transact::<User, _, _>(|users| {
        let user = users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(user_not_found)?;
        relationship::push_activity(user, input);
        Ok(UserProfile::from(&*user))
    })
    .await
}

/// Stores a new profile picture and returns its public path.
pub async fn set_profile_picture(
    db: &Database,
    config: &AppConfig,
    actor: &Claims,
    username: &str,
    content_type: Option<&str>,
    bytes: &[u8],
) -> AppResult<String> {
    actor.require_self_or_admin(username)?;

    let stored = upload_service::store_image(
        &config.upload_dir,
        Some("profile-pictures"),
        username,
        content_type,
        bytes,
        PROFILE_PICTURE_MAX_BYTES,
    )
    .await?;

    let public_path = stored.public_path.clone();
    let outcome = db
        .transact::<User, _, _>(|users| {
            let user = users
                .iter_mut()
                .find(|u| u.username == username)
                .ok_or_else(user_not_found)?;
            Ok(user.profile_picture.replace(public_path.clone()))
        })
        .await;

    match outcome {
        Ok(previous) => {
            if let Some(old) = previous.filter(|p| !p.is_empty() && *p != stored.public_path) {
                upload_service::discard_public(&config.upload_dir, &old).await;
            }
            Ok(stored.public_path)
        }
        Err(e) => {
            upload_service::discard(&stored.path).await;
            Err(e)
        }
    }
}
