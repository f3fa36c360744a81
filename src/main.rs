use tracing::{error, info};

use s1client::{Config, FallbackPolicy, ForumApi, TopicApi, Transport};

/// Characters of each reply shown when printing a topic.
const PREVIEW_CHARS: usize = 60;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = s1client::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        s1client::logging::init_console_only(&config.logging.level);
    }

    info!("s1client - Stage1st forum client");
    info!("Forum at {}", config.client.base_url);

    let transport = match Transport::from_config(&config) {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to create transport: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(user) = transport.current_user() {
        info!("Session belongs to {}", user.username);
    }

    let forum = match ForumApi::from_config(&transport, &config) {
        Ok(forum) => forum,
        Err(e) => {
            error!("Failed to set up parsers: {}", e);
            std::process::exit(1);
        }
    };
    let boards = FallbackPolicy
        .run_or_default("fetch board list", forum.board_list())
        .await;
    for board in &boards {
        println!(
            "{:>6}  {}  ({} topics / {} posts)",
            board.id, board.name, board.threads_count, board.posts_count
        );
    }

    // Optional topic id: print its first page
    let Some(topic_id) = std::env::args().nth(1) else {
        return;
    };
    let topics = match TopicApi::from_config(&transport, &config) {
        Ok(topics) => topics,
        Err(e) => {
            error!("Failed to set up parsers: {}", e);
            std::process::exit(1);
        }
    };
    match topics.topic(&topic_id, 1).await {
        Ok(page) => {
            let topic = &page.topic;
            println!("{topic}");
            for reply in &topic.replies {
                println!(
                    "{:>4}#  {}: {}",
                    reply.floor,
                    reply.author,
                    reply.preview(PREVIEW_CHARS)
                );
            }
            if topic.has_next_page() {
                println!("(page {} of {})", topic.current_page, topic.total_pages);
            }
        }
        Err(e) => error!("Failed to fetch topic {}: {}", topic_id, e),
    }
}
