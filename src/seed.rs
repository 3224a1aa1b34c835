use crate::{
    error::AppError,
    models::{Division, Employee, NamedPayload, NewEmployee, Role},
    password,
    service::ResourceService,
};

pub const DEFAULT_ROLES: [&str; 2] = ["Admin", "User"];
pub const DEFAULT_DIVISIONS: [&str; 3] = ["Finance", "Information Technology", "Human Resource"];

/// Password shared by every demo employee.
pub const DEMO_PASSWORD: &str = "123abcABC!";

/// (fullname, email, role_id, division_id)
pub const DEMO_EMPLOYEES: [(&str, &str, i64, i64); 3] = [
    ("Vincent L. Hubbard", "vincentlhubbard@superrito.com", 1, 1),
    ("Devon C. Thomas", "devoncthomas@superrito.com", 2, 1),
    ("Bettina M. Easter", "bettinameaster@superrito.com", 2, 2),
];

/// Default roles and divisions plus the demo employees.
///
/// Safe to run repeatedly: rows whose natural key already exists are skipped.
pub async fn seed(
    roles: &ResourceService<Role>,
    divisions: &ResourceService<Division>,
    employees: &ResourceService<Employee>,
) -> Result<(), AppError> {
    for name in DEFAULT_ROLES {
        skip_existing(roles.create(NamedPayload { name: name.to_string() }).await)?;
    }
    for name in DEFAULT_DIVISIONS {
        skip_existing(divisions.create(NamedPayload { name: name.to_string() }).await)?;
    }

    for (fullname, email, role_id, division_id) in DEMO_EMPLOYEES {
        if employees.find_by_key(email).await?.is_some() {
            continue;
        }
        let new = NewEmployee {
            fullname: fullname.to_string(),
            email: email.to_string(),
            password_hash: password::hash_off_thread(DEMO_PASSWORD.to_string()).await?,
            role_id,
            division_id,
        };
        skip_existing(employees.create(new).await)?;
    }

    tracing::info!("seed data in place");
    Ok(())
}

fn skip_existing<T>(result: Result<T, AppError>) -> Result<(), AppError> {
    match result {
        Ok(_) | Err(AppError::Duplicate(_)) => Ok(()),
        Err(err) => Err(err),
    }
}
