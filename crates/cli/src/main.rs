use std::io::{self, Write};

use bytes::BytesMut;
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use stormcache_common::{DEFAULT_HOST, DEFAULT_PORT};
use stormcache_protocol::{Frame, Reply};

#[derive(Parser, Debug)]
#[command(name = "stormcache-cli", about = "stormcache CLI client")]
struct Args {
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Comando para executar diretamente (modo não interativo)
    #[arg(trailing_var_arg = true)]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let mut stream = TcpStream::connect(&addr).await?;

    // Modo comando único (via argumentos)
    if !args.command.is_empty() {
        let frame = build_frame(&args.command)?;
        execute_request(&mut stream, frame).await?;
        return Ok(());
    }

    println!("Conectado a {addr}");

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        print!("stormcache> ");
        io::stdout().flush()?;

        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break; // EOF
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            break;
        }

        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }

        let frame = match build_frame(&tokens) {
            Ok(frame) => frame,
            Err(e) => {
                println!("(error) {e}");
                continue;
            }
        };
        if let Err(e) = execute_request(&mut stream, frame).await {
            println!("(error) {e}");
        }
    }

    Ok(())
}

/// Monta a requisição a partir dos tokens digitados.
///
/// Comandos de armazenamento são digitados como `set <key> <exptime> <value>`;
/// o comprimento do bloco de dados é calculado aqui.
fn build_frame(tokens: &[String]) -> anyhow::Result<Frame> {
    let name = tokens[0].to_lowercase();
    match name.as_str() {
        "add" | "set" | "replace" => {
            let [_, key, exptime, value] = tokens else {
                anyhow::bail!("uso: {name} <key> <exptime> <value>");
            };
            let exptime: i64 = exptime
                .parse()
                .map_err(|_| anyhow::anyhow!("exptime inválido: '{exptime}'"))?;
            Ok(Frame::storage(&name, key, exptime, value.as_bytes()))
        }
        _ => Ok(Frame::line(&tokens.join(" "))),
    }
}

async fn execute_request(stream: &mut TcpStream, frame: Frame) -> anyhow::Result<()> {
    let mut buf = BytesMut::new();
    frame.encode(&mut buf);

    stream.write_all(&buf).await?;
    stream.flush().await?;

    // Ler resposta
    let mut response_buf = BytesMut::with_capacity(4096);
    loop {
        let n = stream.read_buf(&mut response_buf).await?;
        if n == 0 {
            return Err(anyhow::anyhow!("servidor fechou a conexão"));
        }

        let mut cursor = std::io::Cursor::new(&response_buf[..]);
        if Reply::check(&mut cursor).is_ok() {
            cursor.set_position(0);
            let response =
                Reply::parse(&mut cursor).map_err(|e| anyhow::anyhow!("parse error: {e}"))?;
            println!("{}", format_reply(&response));
            break;
        }
    }
    Ok(())
}

/// Tokeniza a linha de input com suporte a strings quoted.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut quote_char = '"';
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quote {
            if c == quote_char {
                in_quote = false;
            } else if c == '\\' {
                if let Some(&next) = chars.peek() {
                    match next {
                        'n' => {
                            current.push('\n');
                            chars.next();
                        }
                        'r' => {
                            current.push('\r');
                            chars.next();
                        }
                        't' => {
                            current.push('\t');
                            chars.next();
                        }
                        '\\' | '"' | '\'' => {
                            current.push(next);
                            chars.next();
                        }
                        _ => current.push(c),
                    }
                }
            } else {
                current.push(c);
            }
        } else if c == '"' || c == '\'' {
            in_quote = true;
            quote_char = c;
        } else if c.is_whitespace() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Formata uma resposta para exibição humana.
fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::Stored => "STORED".into(),
        Reply::NotStored => "NOT_STORED".into(),
        Reply::Deleted => "DELETED".into(),
        Reply::NotFound => "NOT_FOUND".into(),
        Reply::Values(values) => {
            if values.is_empty() {
                return "(nil)".into();
            }
            let mut lines = Vec::new();
            for (i, (key, data)) in values.iter().enumerate() {
                let shown = match std::str::from_utf8(data) {
                    Ok(s) => format!("\"{s}\""),
                    Err(_) => format!("(binary) {} bytes", data.len()),
                };
                lines.push(format!("{}) {key} => {shown}", i + 1));
            }
            lines.join("\n")
        }
        Reply::Error => "(error) ERROR".into(),
        Reply::ClientError(msg) => format!("(error) CLIENT_ERROR {msg}"),
        Reply::ServerError(msg) => format!("(error) SERVER_ERROR {msg}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn strings(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokenize_simple() {
        assert_eq!(tokenize("get a b"), vec!["get", "a", "b"]);
    }

    #[test]
    fn tokenize_quoted() {
        assert_eq!(
            tokenize(r#"set greeting 0 "hi jeff""#),
            vec!["set", "greeting", "0", "hi jeff"]
        );
    }

    #[test]
    fn tokenize_single_quotes() {
        assert_eq!(
            tokenize("set key 0 'hello world'"),
            vec!["set", "key", "0", "hello world"]
        );
    }

    #[test]
    fn tokenize_escaped() {
        assert_eq!(
            tokenize(r#"set key 0 "hello\"world""#),
            vec!["set", "key", "0", r#"hello"world"#]
        );
    }

    #[test]
    fn tokenize_empty() {
        assert_eq!(tokenize(""), Vec::<String>::new());
    }

    #[test]
    fn build_storage_frame_computes_length() {
        let frame = build_frame(&strings(&["set", "greeting", "0", "hi jeff"])).unwrap();
        assert_eq!(frame, Frame::storage("set", "greeting", 0, b"hi jeff"));
    }

    #[test]
    fn build_storage_frame_wrong_arity() {
        assert!(build_frame(&strings(&["add", "k", "0"])).is_err());
        assert!(build_frame(&strings(&["set", "k", "soon", "v"])).is_err());
    }

    #[test]
    fn build_line_frame() {
        let frame = build_frame(&strings(&["get", "a", "b"])).unwrap();
        assert_eq!(frame, Frame::line("get a b"));
    }

    #[test]
    fn format_values() {
        let reply = Reply::Values(vec![("greeting".into(), Bytes::from("hi jeff"))]);
        assert_eq!(format_reply(&reply), "1) greeting => \"hi jeff\"");
    }

    #[test]
    fn format_empty_values() {
        assert_eq!(format_reply(&Reply::Values(vec![])), "(nil)");
    }

    #[test]
    fn format_error() {
        let reply = Reply::ClientError("bad data chunk".into());
        assert_eq!(format_reply(&reply), "(error) CLIENT_ERROR bad data chunk");
    }
}
