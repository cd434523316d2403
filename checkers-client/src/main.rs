use anyhow::{Context, Result};
use checkers_client::command::{Command, HELP};
use checkers_client::game::GameClient;
use checkers_client::network::{spawn_relay, RelayEvent};
use checkers_client::settings::{ClientSettings, SERVER_ENV};
use protocol::{Connector, FrameWriter, OutboundMessage, TcpConnector};
use tokio::io::{AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = ClientSettings::load()
        .with_server_override(std::env::var(SERVER_ENV).ok().as_deref())?;

    // 初始化日志，RUST_LOG 优先于设置文件
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let addr = settings.server.addr();
    info!("跳棋客户端启动，连接 {}", addr);

    let mut conn = TcpConnector
        .connect(&addr)
        .await
        .with_context(|| format!("failed to connect to {}", addr))?;
    let uid = conn
        .read_session_id()
        .await
        .context("relay did not send a session id")?;
    let (reader, mut writer) = conn.split();

    let (tx, mut rx) = mpsc::channel(32);
    let relay = spawn_relay(reader, tx);

    let mut client = GameClient::new(uid);
    println!("connected as session {} ({:?}), waiting for an opponent", uid, client.user_side());
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    client.forfeit();
                    flush(&client, &mut writer).await?;
                    break;
                };
                let command = match Command::parse(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                match command {
                    Command::Board => println!("{}", client.session().board()),
                    Command::Help => println!("{}", HELP),
                    Command::Forfeit => report(client.forfeit()),
                    Command::Quit => {
                        client.forfeit();
                        flush(&client, &mut writer).await?;
                        break;
                    }
                    other => {
                        if let Some(event) = other.to_event() {
                            report(client.handle_local(event));
                        }
                    }
                }
            }
            event = rx.recv() => match event {
                Some(RelayEvent::Message(msg)) => report(client.handle_inbound(msg)),
                Some(RelayEvent::Closed) | None => {
                    println!("connection to the relay was lost");
                    break;
                }
            },
        }

        flush(&client, &mut writer).await?;
        if client.is_over() {
            break;
        }
    }

    if let Err(e) = writer.shutdown().await {
        warn!("failed to close the connection: {}", e);
    }
    relay.abort();
    info!("客户端退出");
    Ok(())
}

/// 显示提示并把待发送消息写给对端
async fn flush<W>(client: &GameClient, writer: &mut FrameWriter<W>) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
{
    for line in client.take_notices() {
        println!("{}", line);
    }
    for msg in client.take_outbound() {
        writer
            .send(&msg)
            .await
            .with_context(|| format!("failed to send {:?}", msg))?;
        if let OutboundMessage::Moves(record) = &msg {
            info!("sent {}", record.moves);
        }
    }
    Ok(())
}

fn report(errors: Vec<protocol::CheckersError>) {
    for e in errors {
        println!("rejected: {}", e);
    }
}
