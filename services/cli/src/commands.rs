use crate::context::{parse_datetime, Context};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use realty_desk::auth::{AuthApi, Registration};
use realty_desk::client::ApiError;
use realty_desk::error::AppError;
use realty_desk::properties::{
    write_csv, DealType, PropertiesApi, Property, PropertyDraft, PropertyFilters, PropertyPatch,
    PropertyStatus,
};
use realty_desk::session::{self, TokenState};
use realty_desk::showings::{NewShowing, ShowingRange, ShowingsApi};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;

pub(crate) fn parse_deal_type(raw: &str) -> Result<DealType, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "sale" => Ok(DealType::Sale),
        "rent" => Ok(DealType::Rent),
        other => Err(format!("unknown deal type '{other}' (sale, rent)")),
    }
}

pub(crate) fn parse_status(raw: &str) -> Result<PropertyStatus, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "draft" => Ok(PropertyStatus::Draft),
        "active" => Ok(PropertyStatus::Active),
        "reserved" => Ok(PropertyStatus::Reserved),
        "sold" => Ok(PropertyStatus::Sold),
        "archived" => Ok(PropertyStatus::Archived),
        other => Err(format!(
            "unknown status '{other}' (draft, active, reserved, sold, archived)"
        )),
    }
}

#[derive(Args, Debug)]
pub(crate) struct LoginArgs {
    /// Email or username
    #[arg(long)]
    pub(crate) identity: String,
    #[arg(long)]
    pub(crate) password: String,
}

#[derive(Args, Debug)]
pub(crate) struct RegisterArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) password: String,
}

#[derive(Args, Debug)]
pub(crate) struct VerifyArgs {
    #[arg(long)]
    pub(crate) email: String,
    /// Six-digit code from the verification email
    #[arg(long)]
    pub(crate) code: String,
}

#[derive(Args, Debug)]
pub(crate) struct EmailArgs {
    #[arg(long)]
    pub(crate) email: String,
}

#[derive(Args, Debug)]
pub(crate) struct ResetArgs {
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) code: String,
    #[arg(long)]
    pub(crate) new_password: String,
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct FilterArgs {
    #[arg(long, value_parser = parse_deal_type)]
    pub(crate) deal_type: Option<DealType>,
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: Option<PropertyStatus>,
    #[arg(long)]
    pub(crate) district: Option<String>,
    #[arg(long)]
    pub(crate) rooms: Option<u32>,
    #[arg(long)]
    pub(crate) price_min: Option<f64>,
    #[arg(long)]
    pub(crate) price_max: Option<f64>,
    #[arg(long)]
    pub(crate) area_min: Option<f64>,
    #[arg(long)]
    pub(crate) area_max: Option<f64>,
    /// Free-text search over title, address and description
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Backend ordering key, e.g. `-price` or `created_at`
    #[arg(long)]
    pub(crate) ordering: Option<String>,
    #[arg(long)]
    pub(crate) page: Option<u32>,
    #[arg(long)]
    pub(crate) page_size: Option<u32>,
}

impl From<FilterArgs> for PropertyFilters {
    fn from(args: FilterArgs) -> Self {
        PropertyFilters {
            deal_type: args.deal_type,
            status: args.status,
            district: args.district,
            rooms: args.rooms,
            price_min: args.price_min,
            price_max: args.price_max,
            area_min: args.area_min,
            area_max: args.area_max,
            search: args.search,
            ordering: args.ordering,
            page: args.page,
            page_size: args.page_size,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct CreatePropertyArgs {
    #[arg(long)]
    pub(crate) title: String,
    #[arg(long, value_parser = parse_deal_type)]
    pub(crate) deal_type: DealType,
    #[arg(long, value_parser = parse_status, default_value = "draft")]
    pub(crate) status: PropertyStatus,
    #[arg(long)]
    pub(crate) rooms: u32,
    #[arg(long)]
    pub(crate) area: f64,
    #[arg(long)]
    pub(crate) price: f64,
    #[arg(long)]
    pub(crate) address: Option<String>,
    #[arg(long)]
    pub(crate) district: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct UpdatePropertyArgs {
    pub(crate) id: u64,
    #[arg(long)]
    pub(crate) title: Option<String>,
    #[arg(long, value_parser = parse_deal_type)]
    pub(crate) deal_type: Option<DealType>,
    #[arg(long, value_parser = parse_status)]
    pub(crate) status: Option<PropertyStatus>,
    #[arg(long)]
    pub(crate) rooms: Option<u32>,
    #[arg(long)]
    pub(crate) area: Option<f64>,
    #[arg(long)]
    pub(crate) price: Option<f64>,
    #[arg(long)]
    pub(crate) address: Option<String>,
    #[arg(long)]
    pub(crate) district: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    #[command(flatten)]
    pub(crate) filters: FilterArgs,
    /// Write to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Follow `next` links until the feed is exhausted
    #[arg(long)]
    pub(crate) all_pages: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ListShowingsArgs {
    /// today, upcoming or all
    #[arg(long, default_value = "today")]
    pub(crate) range: ShowingRange,
    #[arg(long, default_value_t = 1)]
    pub(crate) page: u32,
}

#[derive(Args, Debug)]
pub(crate) struct CreateShowingArgs {
    #[arg(long)]
    pub(crate) property: u64,
    /// RFC 3339 or local `YYYY-MM-DD HH:MM`
    #[arg(long, value_parser = parse_datetime)]
    pub(crate) at: DateTime<Utc>,
    #[arg(long)]
    pub(crate) client_name: Option<String>,
    #[arg(long)]
    pub(crate) client_phone: Option<String>,
    #[arg(long)]
    pub(crate) note: Option<String>,
}

pub(crate) async fn login(ctx: &Context, args: LoginArgs) -> Result<(), AppError> {
    let landing = ctx.shell.sign_in(&args.identity, &args.password).await?;
    println!(
        "Signed in as {} (session saved to {}; landing on {landing})",
        args.identity.trim(),
        ctx.session_path.display()
    );
    Ok(())
}

pub(crate) fn logout(ctx: &Context) -> Result<(), AppError> {
    ctx.shell.sign_out()?;
    println!("Signed out; stored tokens removed.");
    Ok(())
}

pub(crate) async fn whoami(ctx: &Context) -> Result<(), AppError> {
    ctx.enter("/profile")?;
    let store = ctx.client().store().clone();
    let token_state = session::access_token(store.as_ref())
        .map(|token| session::inspect(&token, Utc::now()));

    let profile = AuthApi::new(ctx.client()).me().await?;
    println!(
        "{} <{}> id={} role={}",
        profile.username.as_deref().unwrap_or("-"),
        profile.email,
        profile.id,
        profile.role.as_deref().unwrap_or("-")
    );
    match token_state {
        Some(TokenState::Valid { expires_at }) => println!(
            "Access token valid until {}",
            expires_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        Some(TokenState::Expired) => println!("Access token had expired and was refreshed"),
        Some(TokenState::Malformed) | None => println!("Access token carries no expiry"),
    }
    Ok(())
}

pub(crate) async fn register(ctx: &Context, args: RegisterArgs) -> Result<(), AppError> {
    let registration = Registration::with_email(&args.email, &args.password);
    match AuthApi::new(ctx.client()).register(&registration).await {
        Ok(_) => {
            println!(
                "Account {} created; signed in (session saved to {}).",
                registration.email,
                ctx.session_path.display()
            );
            Ok(())
        }
        Err(ApiError::RegisteredButSignInFailed(reason)) => {
            println!(
                "Account {} created, but signing in failed ({reason}). Confirm the emailed code with `realty-desk verify` or run `realty-desk login`.",
                registration.email
            );
            Err(ApiError::RegisteredButSignInFailed(reason).into())
        }
        Err(err) => Err(err.into()),
    }
}

pub(crate) async fn verify(ctx: &Context, args: VerifyArgs) -> Result<(), AppError> {
    AuthApi::new(ctx.client())
        .verify_email_code(&args.email, &args.code)
        .await?;
    println!("Email verified; signed in.");
    Ok(())
}

pub(crate) async fn resend_code(ctx: &Context, args: EmailArgs) -> Result<(), AppError> {
    AuthApi::new(ctx.client())
        .resend_email_code(&args.email)
        .await?;
    println!("A new code is on its way to {}.", args.email.trim());
    Ok(())
}

pub(crate) async fn password_forgot(ctx: &Context, args: EmailArgs) -> Result<(), AppError> {
    AuthApi::new(ctx.client())
        .request_password_reset(&args.email)
        .await?;
    println!("If the account exists, a reset code was sent to {}.", args.email.trim());
    Ok(())
}

pub(crate) async fn password_reset(ctx: &Context, args: ResetArgs) -> Result<(), AppError> {
    AuthApi::new(ctx.client())
        .confirm_password_reset(&args.email, &args.code, &args.new_password)
        .await?;
    println!("Password updated; sign in with the new password.");
    Ok(())
}

pub(crate) async fn list_properties(ctx: &Context, args: FilterArgs) -> Result<(), AppError> {
    ctx.enter("/properties")?;
    let page = PropertiesApi::new(ctx.client())
        .list(&args.into())
        .await?;

    println!("{} listings", page.count);
    for property in &page.results {
        println!("{}", summary_line(property));
    }
    if page.has_more() {
        println!("(more available; pass --page to continue)");
    }
    Ok(())
}

pub(crate) async fn show_property(ctx: &Context, id: u64) -> Result<(), AppError> {
    ctx.enter(&format!("/properties/{id}"))?;
    let api = PropertiesApi::new(ctx.client());
    let property = api.get(id).await?;
    let images = match api.images(id).await {
        Err(ApiError::Rejected { status: 404, .. }) => Vec::new(),
        other => other?,
    };

    println!("{}", summary_line(&property));
    if let Some(address) = &property.address {
        println!("  Address: {address}");
    }
    if let Some(description) = &property.description {
        println!("  {description}");
    }
    if let Some(created_at) = property.created_at {
        println!("  Listed {}", created_at.with_timezone(&Local).format("%Y-%m-%d"));
    }
    if images.is_empty() {
        println!("  Images: none");
    } else {
        println!("  Images:");
        for image in images {
            println!("    - {}", image.url);
        }
    }
    Ok(())
}

pub(crate) async fn create_property(
    ctx: &Context,
    args: CreatePropertyArgs,
) -> Result<(), AppError> {
    ctx.enter("/properties/new")?;
    let draft = PropertyDraft {
        title: args.title,
        description: args.description,
        address: args.address,
        deal_type: args.deal_type,
        status: args.status,
        district: args.district,
        rooms: args.rooms,
        area: args.area,
        price: args.price,
    };
    let created = PropertiesApi::new(ctx.client()).create(&draft).await?;
    info!(id = created.id, "listing created");
    println!("Created {}", summary_line(&created));
    Ok(())
}

pub(crate) async fn update_property(
    ctx: &Context,
    args: UpdatePropertyArgs,
) -> Result<(), AppError> {
    ctx.enter(&format!("/properties/{}/edit", args.id))?;
    let patch = PropertyPatch {
        title: args.title,
        description: args.description,
        address: args.address,
        deal_type: args.deal_type,
        status: args.status,
        district: args.district,
        rooms: args.rooms,
        area: args.area,
        price: args.price,
    };
    let updated = PropertiesApi::new(ctx.client())
        .update(args.id, &patch)
        .await?;
    println!("Updated {}", summary_line(&updated));
    Ok(())
}

pub(crate) async fn delete_property(ctx: &Context, id: u64) -> Result<(), AppError> {
    ctx.enter(&format!("/properties/{id}"))?;
    PropertiesApi::new(ctx.client()).delete(id).await?;
    println!("Deleted listing {id}");
    Ok(())
}

pub(crate) async fn export_properties(ctx: &Context, args: ExportArgs) -> Result<(), AppError> {
    ctx.enter("/properties")?;
    let api = PropertiesApi::new(ctx.client());
    let mut filters: PropertyFilters = args.filters.into();
    let mut properties = Vec::new();

    loop {
        let page = api.list(&filters).await?;
        let has_more = page.has_more();
        properties.extend(page.results);
        if !args.all_pages || !has_more {
            break;
        }
        filters.page = Some(filters.page.unwrap_or(1) + 1);
    }

    match args.output {
        Some(path) => {
            write_csv(File::create(&path)?, &properties)?;
            println!("Exported {} listings to {}", properties.len(), path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_csv(&mut handle, &properties)?;
            handle.flush()?;
        }
    }
    Ok(())
}

pub(crate) async fn list_showings(ctx: &Context, args: ListShowingsArgs) -> Result<(), AppError> {
    ctx.enter("/showings")?;
    let page = ShowingsApi::new(ctx.client())
        .list(args.page, args.range)
        .await?;

    if page.results.is_empty() {
        println!("No showings ({})", args.range.as_str());
        return Ok(());
    }
    for showing in &page.results {
        let property = showing
            .property_title
            .clone()
            .or_else(|| showing.property_id.map(|id| format!("listing {id}")))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{} {} | {} | {} {}",
            showing.id,
            showing.datetime.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            property,
            showing.client_name.as_deref().unwrap_or("-"),
            showing.client_phone.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

pub(crate) async fn create_showing(
    ctx: &Context,
    args: CreateShowingArgs,
) -> Result<(), AppError> {
    ctx.enter("/showings/new")?;
    let showing = NewShowing {
        property_id: args.property,
        datetime: args.at,
        client_name: args.client_name,
        client_phone: args.client_phone,
        note: args.note,
    };
    let created = ShowingsApi::new(ctx.client()).create(&showing).await?;
    println!(
        "Scheduled showing #{} at {}",
        created.id,
        created.datetime.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    Ok(())
}

fn summary_line(property: &Property) -> String {
    format!(
        "#{} {} | {} / {} | {} rooms, {:.1} m2 | {:.0} | {}",
        property.id,
        property.title,
        property.deal_type.label(),
        property.status.label(),
        property.rooms,
        property.area,
        property.price,
        property.district.as_deref().unwrap_or("-")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deal_and_status_parsers_are_case_insensitive() {
        assert_eq!(parse_deal_type(" Rent "), Ok(DealType::Rent));
        assert_eq!(parse_status("SOLD"), Ok(PropertyStatus::Sold));
        assert!(parse_status("pending").is_err());
    }

    #[test]
    fn filter_args_map_onto_feed_filters() {
        let filters: PropertyFilters = FilterArgs {
            deal_type: Some(DealType::Sale),
            rooms: Some(3),
            ..FilterArgs::default()
        }
        .into();
        assert_eq!(
            filters.to_query(),
            vec![
                ("deal_type".to_string(), "sale".to_string()),
                ("rooms".to_string(), "3".to_string()),
            ]
        );
    }
}
