//! Session and account commands.

use secrecy::{ExposeSecret, SecretString};

use dwa_client::SessionStatus;
use dwa_client::session::{self, SignUp};
use dwa_core::validation::{LoginForm, SignupForm};

use super::{CommandError, Context};

/// Report backend reachability and the state of the saved session.
#[allow(clippy::print_stdout)]
pub async fn ping(ctx: &Context) -> Result<(), CommandError> {
    let health = ctx.client.api().health().await?;
    println!("Backend: {health}");
    match ctx.status {
        SessionStatus::Valid => println!("Session: signed in as {}", ctx.store.user().email),
        SessionStatus::Anonymous => println!("Session: not signed in"),
        SessionStatus::Reset => println!("Session: expired and cleared"),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn login(ctx: &Context, email: String, password: String) -> Result<(), CommandError> {
    let password = SecretString::from(password);
    let form = LoginForm::new(email, password.expose_secret());
    let signed_in = session::sign_in(&ctx.client, &ctx.store, &form).await?;

    println!(
        "Signed in as {} ({}). Start at {}",
        signed_in.user.name, signed_in.user.user_type, signed_in.dashboard
    );
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn signup(
    ctx: &Context,
    email: String,
    password: String,
    name: String,
    is_vendor: bool,
) -> Result<(), CommandError> {
    let password = SecretString::from(password);
    let form = SignupForm {
        email,
        password: password.expose_secret().to_string(),
        name,
        is_vendor,
    };
    let outcome = session::sign_up(
        &ctx.client,
        &ctx.store,
        &form,
        ctx.config.signup_email_domain.as_deref(),
    )
    .await?;

    match outcome {
        SignUp::SignedIn(signed_in) => println!(
            "Welcome, {}! Start at {}",
            signed_in.user.name, signed_in.dashboard
        ),
        SignUp::Created { message } if message.is_empty() => {
            println!("Account created. Sign in with `dwa login`.");
        }
        SignUp::Created { message } => println!("{message}. Sign in with `dwa login`."),
    }
    Ok(())
}

pub fn logout(ctx: &Context) -> Result<(), CommandError> {
    session::sign_out(&ctx.client, &ctx.store, ctx.navigator.as_ref())?;
    Ok(())
}

#[allow(clippy::print_stdout)]
pub fn whoami(ctx: &Context) {
    let user = ctx.store.user();
    if user.is_authenticated() {
        println!("{} <{}>", user.name, user.email);
        println!("  id:   {}", user.uid);
        println!("  role: {}", user.user_type);
    } else {
        println!("Not signed in");
    }
}

#[allow(clippy::print_stdout)]
pub async fn update_profile(ctx: &Context, email: &str, name: &str) -> Result<(), CommandError> {
    ctx.require_user()?;
    let message = session::update_profile(&ctx.client, &ctx.store, email, name).await?;
    if message.is_empty() {
        println!("Profile updated");
    } else {
        println!("{message}");
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn delete_account(ctx: &Context, confirmed: bool) -> Result<(), CommandError> {
    let user = ctx.require_user()?;
    if !confirmed {
        return Err(CommandError::Unconfirmed("delete the account"));
    }
    session::delete_account(&ctx.client, &ctx.store, ctx.navigator.as_ref()).await?;
    println!("Deleted account {}", user.email);
    Ok(())
}
