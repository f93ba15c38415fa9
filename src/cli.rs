//! Command-line front end.
//!
//! Provides subcommands for the RentKar backend:
//! - `login` / `register` / `logout` / `whoami` - session management
//! - `sent` / `received` - list borrow requests for one side
//! - `approve` / `reject` / `return` / `confirm` / `cancel` - request actions
//! - `borrow` - send a new borrow request
//! - `items` / `item` - browse the catalog
//! - `my-items` / `add-item` / `edit-item` / `delete-item` - manage your own items
//! - `upload` / `generate-title` / `generate-description` - listing helpers
//!
//! Request actions go through `RequestsController`, so the same guards,
//! optimistic updates and notifications apply as in any other front end.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::{
    error::{AppError, AppResult},
    models::{
        item::{AiGenerationRequest, CreateItem, GenerationKind, ImageUpload, UpdateItem},
        BorrowRequest, CreateBorrowRequest, Item, ItemQuery, ItemStatus, LoginRequest, Page,
        RegisterRequest, RequestAction, RequestStatistics, StatusFilter, ViewRole,
    },
    services::{
        notifications::{Notification, NotificationLevel},
        session::failure_message,
        Services,
    },
    views::{format_date_time, RequestCard, RequestDetail},
    workflow::{ActionOutcome, RequestsController},
};

/// CLI arguments structure
#[derive(Parser, Debug)]
#[command(name = "rentkar")]
#[command(author, version, about = "Borrow and lend items with your neighbours", long_about = None)]
pub struct Cli {
    /// Configuration directory
    #[arg(short, long, default_value = "config")]
    pub config: String,

    /// Override log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// API URL to connect to (default: http://localhost:8080/api)
    #[arg(long, env = "RENTKAR_API_URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in and remember the session
    Login {
        username: String,
        /// Password (can also be set via RENTKAR_PASSWORD)
        #[arg(long, env = "RENTKAR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account
    Register {
        username: String,
        #[arg(long)]
        email: String,
        #[arg(long = "name")]
        full_name: String,
        #[arg(long, env = "RENTKAR_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Forget the current session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Requests you sent as a borrower
    Sent {
        /// ALL, PENDING, APPROVED, REJECTED, RETURNED or COMPLETED
        #[arg(short, long, default_value = "ALL")]
        status: StatusFilter,
    },

    /// Requests received for your items
    Received {
        #[arg(short, long, default_value = "ALL")]
        status: StatusFilter,
    },

    /// Request counts per status
    Stats,

    /// Show one request in full
    Show { id: i64 },

    /// Approve a pending request for one of your items
    Approve {
        id: i64,
        /// Optional message for the borrower
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Reject a pending request for one of your items
    Reject {
        id: i64,
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Mark a lent item as returned
    Return { id: i64 },

    /// Confirm you got a borrowed item back to its owner
    Confirm { id: i64 },

    /// Cancel one of your pending requests
    Cancel {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Ask to borrow an item
    Borrow {
        item_id: i64,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: NaiveDate,
        /// Return day (YYYY-MM-DD)
        #[arg(long)]
        until: NaiveDate,
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Browse the catalog
    Items {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "0")]
        page: u32,
        #[arg(long, default_value = "10")]
        size: u32,
    },

    /// Show one catalog item
    Item { id: i64 },

    /// Items you own
    MyItems {
        #[arg(long, default_value = "0")]
        page: u32,
        #[arg(long, default_value = "10")]
        size: u32,
    },

    /// List a new item
    AddItem {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// URL returned by `upload`
        #[arg(long)]
        image: Option<String>,
    },

    /// Change one of your items
    EditItem {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        image: Option<String>,
        /// AVAILABLE, BORROWED or UNAVAILABLE
        #[arg(long)]
        status: Option<ItemStatus>,
    },

    /// Remove one of your items
    DeleteItem {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Suggest a title for an item
    GenerateTitle {
        item_name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        info: Option<String>,
    },

    /// Suggest a description for an item
    GenerateDescription {
        item_name: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        info: Option<String>,
        #[arg(long)]
        condition: Option<String>,
    },

    /// Upload an item image
    Upload { file: PathBuf },
}

/// Run a CLI command
pub async fn run(
    command: Commands,
    services: &Services,
    notifications: &mut UnboundedReceiver<Notification>,
) -> AppResult<ExitCode> {
    match command {
        Commands::Login { username, password } => cmd_login(services, username, password).await,
        Commands::Register {
            username,
            email,
            full_name,
            password,
            phone,
        } => {
            let data = RegisterRequest {
                username,
                email,
                password,
                full_name,
                phone,
            };
            cmd_register(services, data).await
        }
        Commands::Logout => {
            services.session.logout();
            println!("Logged out.");
            Ok(ExitCode::SUCCESS)
        }
        Commands::Whoami => cmd_whoami(services),
        Commands::Sent { status } => cmd_list(services, ViewRole::Borrower, status).await,
        Commands::Received { status } => cmd_list(services, ViewRole::Lender, status).await,
        Commands::Stats => cmd_stats(services).await,
        Commands::Show { id } => cmd_show(services, id).await,
        Commands::Approve { id, message } => {
            cmd_respond(services, notifications, RequestAction::Approve, id, message).await
        }
        Commands::Reject { id, message } => {
            cmd_respond(services, notifications, RequestAction::Reject, id, message).await
        }
        Commands::Return { id } => {
            cmd_action(services, notifications, ViewRole::Lender, RequestAction::Return, id).await
        }
        Commands::Confirm { id } => {
            cmd_action(services, notifications, ViewRole::Borrower, RequestAction::Confirm, id).await
        }
        Commands::Cancel { id, yes } => cmd_cancel(services, notifications, id, yes).await,
        Commands::Borrow {
            item_id,
            from,
            until,
            message,
        } => {
            let request = CreateBorrowRequest {
                borrow_date: from,
                return_date: until,
                request_message: message.filter(|m| !m.trim().is_empty()),
            };
            cmd_borrow(services, item_id, request).await
        }
        Commands::Items {
            search,
            category,
            page,
            size,
        } => {
            let query = ItemQuery {
                search,
                category,
                page,
                size,
                ..Default::default()
            };
            cmd_items(services, query).await
        }
        Commands::Item { id } => cmd_item(services, id).await,
        Commands::MyItems { page, size } => cmd_my_items(services, page, size).await,
        Commands::AddItem {
            title,
            description,
            category,
            image,
        } => {
            let item = CreateItem {
                title,
                description,
                category,
                image_url: image,
            };
            cmd_add_item(services, item).await
        }
        Commands::EditItem {
            id,
            title,
            description,
            category,
            image,
            status,
        } => {
            let changes = UpdateItem {
                title,
                description,
                category,
                image_url: image,
                status,
            };
            cmd_edit_item(services, id, changes).await
        }
        Commands::DeleteItem { id, yes } => cmd_delete_item(services, id, yes).await,
        Commands::GenerateTitle {
            item_name,
            category,
            info,
        } => {
            let request = AiGenerationRequest {
                item_name,
                category,
                additional_info: info,
                ..Default::default()
            };
            cmd_generate(services, GenerationKind::Title, request).await
        }
        Commands::GenerateDescription {
            item_name,
            category,
            info,
            condition,
        } => {
            let request = AiGenerationRequest {
                item_name,
                category,
                additional_info: info,
                condition,
                ..Default::default()
            };
            cmd_generate(services, GenerationKind::Description, request).await
        }
        Commands::Upload { file } => cmd_upload(services, file).await,
    }
}

fn require_login(services: &Services) -> AppResult<()> {
    if services.session.is_authenticated() {
        Ok(())
    } else {
        Err(AppError::Authentication(
            "You are not logged in. Run `rentkar login <username>` first.".to_string(),
        ))
    }
}

/// Print pending notifications; returns whether any error was shown
fn print_notifications(notifications: &mut UnboundedReceiver<Notification>) -> bool {
    let mut reported_error = false;
    while let Ok(notification) = notifications.try_recv() {
        match notification.level {
            NotificationLevel::Success => println!("[OK] {}", notification.message),
            NotificationLevel::Error => {
                reported_error = true;
                eprintln!("[!!] {}", notification.message)
            }
        }
    }
    reported_error
}

async fn cmd_login(services: &Services, username: String, password: String) -> AppResult<ExitCode> {
    match services.session.login(LoginRequest { username, password }).await {
        Ok(user) => {
            println!("Logged in as {} ({}).", user.display_name(), user.username);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", failure_message(&e, "Login failed"));
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn cmd_register(services: &Services, data: RegisterRequest) -> AppResult<ExitCode> {
    match services.session.register(data).await {
        Ok(user) => {
            println!("Account {} created. You can now log in.", user.username);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("{}", failure_message(&e, "Registration failed"));
            if let AppError::Validation { field_errors, .. } = &e {
                let mut fields: Vec<_> = field_errors.iter().collect();
                fields.sort();
                for (field, message) in fields {
                    eprintln!("  {}: {}", field, message);
                }
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn cmd_whoami(services: &Services) -> AppResult<ExitCode> {
    match services.session.current_user() {
        Some(user) => {
            println!("{} (@{})", user.display_name(), user.username);
            if !user.email.is_empty() {
                println!("Email:  {}", user.email);
            }
            if let Some(phone) = &user.phone {
                println!("Phone:  {}", phone);
            }
            if let Some(created_at) = user.created_at {
                println!("Member: since {}", format_date_time(created_at));
            }
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Not logged in.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Controller for `role`, loaded with the given filter
async fn load_controller(services: &Services, role: ViewRole, filter: StatusFilter) -> AppResult<RequestsController> {
    require_login(services)?;
    let controller = services.requests_controller(role);
    tokio::join!(controller.set_filter(filter), controller.load_statistics());
    if let Some(error) = controller.load_error() {
        return Err(AppError::ServiceUnavailable(error));
    }
    Ok(controller)
}

async fn cmd_list(services: &Services, role: ViewRole, filter: StatusFilter) -> AppResult<ExitCode> {
    let controller = load_controller(services, role, filter).await?;

    let counts: Vec<String> = controller
        .filter_counts()
        .into_iter()
        .map(|(f, count)| match count {
            Some(count) => format!("{} ({})", f, count),
            None => f.to_string(),
        })
        .collect();
    println!("Filters: {}", counts.join("  "));
    println!();

    let requests = controller.requests();
    if requests.is_empty() {
        match filter {
            StatusFilter::All => println!("No {} requests yet.", role),
            StatusFilter::Only(status) => {
                println!("You don't have any {} requests.", status.as_str().to_lowercase())
            }
        }
    }
    for request in &requests {
        println!("{}", RequestCard::new(request, role, controller.processing_action(request.id)));
        println!();
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_stats(services: &Services) -> AppResult<ExitCode> {
    require_login(services)?;
    let stats: RequestStatistics = services.requests.statistics().await?;

    println!("=== Borrow Requests ===");
    println!();
    println!("Sent:       {}", stats.total_sent);
    println!("Received:   {}", stats.total_received);
    println!();
    println!("Pending:    {}", stats.pending_count);
    println!("Approved:   {}", stats.approved_count);
    println!("Rejected:   {}", stats.rejected_count);
    println!("Returned:   {}", stats.returned_count);
    println!("Completed:  {}", stats.completed_count);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_show(services: &Services, id: i64) -> AppResult<ExitCode> {
    require_login(services)?;
    let request = services.requests.get(id).await?;
    let role = role_in(services, &request);
    println!("{}", RequestDetail::new(&request, role, None));
    Ok(ExitCode::SUCCESS)
}

/// Which side of `request` the current user is on
fn role_in(services: &Services, request: &BorrowRequest) -> ViewRole {
    match services.session.current_user() {
        Some(user) if user.id == request.lender.id => ViewRole::Lender,
        _ => ViewRole::Borrower,
    }
}

fn report(
    controller: &RequestsController,
    notifications: &mut UnboundedReceiver<Notification>,
    result: AppResult<ActionOutcome>,
) -> AppResult<ExitCode> {
    let reported_error = print_notifications(notifications);
    match result {
        Ok(ActionOutcome::Applied(Some(request))) => {
            println!();
            println!("{}", RequestCard::new(&request, controller.role(), None));
            Ok(ExitCode::SUCCESS)
        }
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(_) if reported_error => Ok(ExitCode::FAILURE),
        Err(e) => Err(e),
    }
}

async fn cmd_respond(
    services: &Services,
    notifications: &mut UnboundedReceiver<Notification>,
    action: RequestAction,
    id: i64,
    message: Option<String>,
) -> AppResult<ExitCode> {
    let controller = load_controller(services, ViewRole::Lender, StatusFilter::All).await?;
    controller.request_action(action, id).await?;
    if let Some(message) = message {
        controller.set_response_message(&message)?;
    }
    let result = controller.submit_dialog().await;
    report(&controller, notifications, result)
}

async fn cmd_action(
    services: &Services,
    notifications: &mut UnboundedReceiver<Notification>,
    role: ViewRole,
    action: RequestAction,
    id: i64,
) -> AppResult<ExitCode> {
    let controller = load_controller(services, role, StatusFilter::All).await?;
    let result = controller.request_action(action, id).await;
    report(&controller, notifications, result)
}

async fn cmd_cancel(
    services: &Services,
    notifications: &mut UnboundedReceiver<Notification>,
    id: i64,
    yes: bool,
) -> AppResult<ExitCode> {
    let controller = load_controller(services, ViewRole::Borrower, StatusFilter::All).await?;
    controller.request_action(RequestAction::Cancel, id).await?;

    if !yes && !confirm(&format!("Cancel request #{}? This cannot be undone.", id))? {
        controller.dismiss_dialog();
        println!("Request kept.");
        return Ok(ExitCode::SUCCESS);
    }
    let result = controller.submit_dialog().await;
    report(&controller, notifications, result)
}

fn confirm(prompt: &str) -> AppResult<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn cmd_borrow(services: &Services, item_id: i64, request: CreateBorrowRequest) -> AppResult<ExitCode> {
    require_login(services)?;
    let created = services.requests.create(item_id, &request).await?;
    println!("Request sent! The owner will be notified.");
    println!();
    println!("{}", RequestCard::new(&created, ViewRole::Borrower, None));
    Ok(ExitCode::SUCCESS)
}

fn owner_name(item: &Item) -> &str {
    if item.owner.full_name.is_empty() {
        &item.owner.username
    } else {
        &item.owner.full_name
    }
}

fn print_item_line(item: &Item) {
    println!(
        "#{:<5} {} [{}]{}",
        item.id,
        item.title,
        item.status,
        item.category.as_deref().map(|c| format!(" {}", c)).unwrap_or_default()
    );
}

fn print_page(page: &Page<Item>, empty: &str, show_owner: bool) {
    if page.items.is_empty() {
        println!("{}", empty);
    }
    for item in &page.items {
        print_item_line(item);
        if show_owner {
            println!("       Owner: {}", owner_name(item));
        }
    }
    let pagination = page.pagination;
    if pagination.total_pages > 0 {
        println!();
        println!(
            "Page {} of {} ({} items)",
            pagination.current_page + 1,
            pagination.total_pages,
            pagination.total_items
        );
    }
}

async fn cmd_items(services: &Services, query: ItemQuery) -> AppResult<ExitCode> {
    let page = services.items.list(&query).await?;
    print_page(&page, "No items found.", true);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_item(services: &Services, id: i64) -> AppResult<ExitCode> {
    let item = services.items.get(id).await?;

    print_item_line(&item);
    println!();
    println!("Owner:       {}", owner_name(&item));
    if let Some(description) = &item.description {
        println!("Description: {}", description);
    }
    if let Some(image_url) = &item.image_url {
        println!("Image:       {}", image_url);
    }
    if let Some(created_at) = item.created_at {
        println!("Listed:      {}", format_date_time(created_at));
    }
    println!();
    if item.is_borrowable() {
        println!("Available. Run `rentkar borrow {} --from <date> --until <date>` to ask for it.", item.id);
    } else {
        println!("Not available for new requests right now.");
    }
    Ok(ExitCode::SUCCESS)
}

async fn cmd_my_items(services: &Services, page: u32, size: u32) -> AppResult<ExitCode> {
    require_login(services)?;
    let page = services.items.my_items(page, size).await?;
    print_page(&page, "You haven't listed any items yet.", false);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_add_item(services: &Services, item: CreateItem) -> AppResult<ExitCode> {
    require_login(services)?;
    let created = services.items.create(&item).await?;
    println!("Item listed!");
    print_item_line(&created);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_edit_item(services: &Services, id: i64, changes: UpdateItem) -> AppResult<ExitCode> {
    require_login(services)?;
    if changes.is_empty() {
        return Err(AppError::field("item", "Nothing to update"));
    }
    let updated = services.items.update(id, &changes).await?;
    println!("Item updated.");
    print_item_line(&updated);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_delete_item(services: &Services, id: i64, yes: bool) -> AppResult<ExitCode> {
    require_login(services)?;
    if !yes && !confirm(&format!("Delete item #{}? This cannot be undone.", id))? {
        println!("Item kept.");
        return Ok(ExitCode::SUCCESS);
    }
    services.items.delete(id).await?;
    println!("Item #{} deleted.", id);
    Ok(ExitCode::SUCCESS)
}

async fn cmd_generate(
    services: &Services,
    kind: GenerationKind,
    request: AiGenerationRequest,
) -> AppResult<ExitCode> {
    require_login(services)?;
    if !services.generation.is_available().await {
        eprintln!("AI generation is not available right now.");
        return Ok(ExitCode::FAILURE);
    }

    match services.generation.generate(kind, &request).await {
        Ok(generation) => {
            println!("{}", generation.content);
            if let Some(remaining) = generation.remaining_requests {
                println!();
                println!("{} generations left this hour.", remaining);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e @ AppError::RateLimited { .. }) => {
            match e.retry_after() {
                Some(wait) => eprintln!("{} Try again in {}s.", e.user_message(), wait.as_secs().max(1)),
                None => eprintln!("{}", e.user_message()),
            }
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e),
    }
}

async fn cmd_upload(services: &Services, file: PathBuf) -> AppResult<ExitCode> {
    require_login(services)?;
    let upload = ImageUpload::from_path(&file)?;
    let url = services.items.upload_image(upload).await?;
    println!("{}", url);
    Ok(ExitCode::SUCCESS)
}
