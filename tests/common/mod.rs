//! Test helpers for E2E tests.
//!
//! Provides an in-process fake forum served by axum on a random local port,
//! plus helpers that point a real [`Transport`] at it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use s1client::config::ClientConfig;
use s1client::{BoardCache, RetryPolicy, SessionStore, Transport};

/// Form token served on every page for logged-in users.
pub const FORMHASH: &str = "f0rmh4sh";

/// Login handshake token served on the login page.
pub const LOGINHASH: &str = "LxK9a";

/// Session cookie set by a successful login.
pub const AUTH_COOKIE: &str = "s1_auth";

/// Topic id the fake forum assigns to new topics.
pub const NEW_TOPIC_ID: &str = "9001";

/// Post id the fake forum assigns to new replies.
pub const NEW_POST_ID: &str = "9100";

/// Topic id with a three-page fixture.
pub const TOPIC_ID: &str = "2265995";

/// One request received by the fake forum.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub file: String,
    pub query: HashMap<String, String>,
    pub form: HashMap<String, String>,
    pub cookie: Option<String>,
}

/// Mutable state of the fake forum.
#[derive(Debug, Default)]
pub struct ForumState {
    requests: Mutex<Vec<Recorded>>,
    check_ins: AtomicU32,
    throttled_index_loads: AtomicU32,
}

impl ForumState {
    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests for `file` (e.g. `forum.php`).
    pub fn requests_to(&self, file: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.file == file)
            .collect()
    }

    /// Answer the next `n` board-list loads with a throttle notice.
    pub fn throttle_index(&self, n: u32) {
        self.throttled_index_loads.store(n, Ordering::SeqCst);
    }

    fn record(&self, request: Recorded) {
        self.requests.lock().unwrap().push(request);
    }
}

/// A running fake forum with its own session directory.
pub struct TestForum {
    pub addr: SocketAddr,
    pub state: Arc<ForumState>,
    pub dir: TempDir,
    handle: JoinHandle<()>,
}

impl TestForum {
    /// Start a fake forum on a random local port.
    pub async fn start() -> Self {
        let state = Arc::new(ForumState::default());
        let app = Router::new()
            .route("/2b/:file", get(serve_get).post(serve_post))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake forum");
        let addr = listener.local_addr().expect("Failed to read local address");
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake forum failed");
        });

        Self {
            addr,
            state,
            dir: TempDir::new().expect("Failed to create temp dir"),
            handle,
        }
    }

    /// Base URL of the fake forum.
    pub fn base_url(&self) -> String {
        format!("http://{}/2b", self.addr)
    }

    /// Client configuration with request spacing disabled.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            min_delay_ms: 0,
            max_delay_ms: 0,
            timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Path of the session file.
    pub fn session_path(&self) -> PathBuf {
        self.dir.path().join("session.toml")
    }

    /// A transport over the session file, as a fresh process would open it.
    pub fn transport(&self) -> Transport {
        let store = SessionStore::open(self.session_path(), Duration::from_secs(7 * 24 * 3600));
        Transport::new(&self.client_config(), store).expect("Failed to create transport")
    }

    /// Board-list cache inside the session directory.
    pub fn cache(&self) -> BoardCache {
        BoardCache::new(self.dir.path().join("cache").join("forums.json"))
    }
}

impl Drop for TestForum {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Retry policy with short delays.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_delay: Duration::from_millis(10),
        multiplier: 2.0,
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|c| {
        c.trim()
            .strip_prefix(&format!("{AUTH_COOKIE}="))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    })
}

fn page(body: impl Into<String>) -> Response {
    Html(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>{}</body></html>",
        body.into()
    ))
    .into_response()
}

fn ajax(payload: &str) -> Response {
    (
        [(header::CONTENT_TYPE, "text/xml; charset=utf-8")],
        format!("<?xml version=\"1.0\" encoding=\"utf-8\"?><root><![CDATA[{payload}]]></root>"),
    )
        .into_response()
}

fn message(text: &str) -> Response {
    page(format!(
        r#"<div id="messagetext" class="alert_error"><p>{text}</p></div>"#
    ))
}

fn user_bar(user: Option<&str>) -> String {
    match user {
        Some(name) => format!(
            r#"<div id="um"><p><strong class="vwmy"><a href="space-uid-42.html">{name}</a></strong>
               <a href="member.php?mod=logging&amp;action=logout&amp;formhash={FORMHASH}">退出</a></p></div>"#
        ),
        None => r#"<div id="um"><strong>游客</strong>
                   <a href="member.php?mod=logging&amp;action=login">登录</a></div>"#
            .to_string(),
    }
}

async fn serve_get(
    State(state): State<Arc<ForumState>>,
    Path(file): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let user = session_cookie(&headers);
    state.record(Recorded {
        method: "GET",
        file: file.clone(),
        query: query.clone(),
        form: HashMap::new(),
        cookie: user.clone(),
    });
    let q = |name: &str| query.get(name).map(String::as_str).unwrap_or_default();

    match file.as_str() {
        "member.php" if q("action") == "login" => page(format!(
            r#"<form method="post" name="login" id="loginform_{LOGINHASH}"
                 action="member.php?mod=logging&amp;action=login&amp;loginsubmit=yes&amp;loginhash={LOGINHASH}">
               <input type="hidden" name="formhash" value="{FORMHASH}" />
               <input type="text" name="username" /></form>"#
        )),
        "member.php" if q("action") == "logout" => (
            [(header::SET_COOKIE, format!("{AUTH_COOKIE}=; Max-Age=0; Path=/2b/"))],
            page("<p>您已退出站点</p>"),
        )
            .into_response(),
        "home.php" => page(user_bar(user.as_deref())),
        "index.php" => page(format!(
            r#"{}<input type="hidden" name="formhash" value="{FORMHASH}" />"#,
            user_bar(user.as_deref())
        )),
        "forum.php" => forum_get(&state, &query, user.as_deref()),
        "plugin.php" => check_in(&state, q("formhash"), user.as_deref()),
        "search.php" if query.contains_key("searchid") => page(SEARCH_RESULTS),
        "search.php" => page(
            r#"<div id="messagetext"><p>搜索完成，请稍候...</p>
               <p class="alert_btnleft"><a href="search.php?mod=forum&amp;searchid=77&amp;orderby=lastpost&amp;ascdesc=desc&amp;searchsubmit=yes">如果您的浏览器没有自动跳转，请点击此链接</a></p></div>"#,
        ),
        f if f.starts_with("thread-") => topic_page(f),
        _ => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

async fn serve_post(
    State(state): State<Arc<ForumState>>,
    Path(file): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let user = session_cookie(&headers);
    state.record(Recorded {
        method: "POST",
        file: file.clone(),
        query: query.clone(),
        form: form.clone(),
        cookie: user.clone(),
    });
    let field = |name: &str| form.get(name).map(String::as_str).unwrap_or_default();

    match file.as_str() {
        "member.php" => {
            if field("formhash") != FORMHASH {
                return ajax("请求来路不明，无法提交");
            }
            match (field("username"), field("password")) {
                ("alice", "secret") => (
                    [(header::SET_COOKIE, format!("{AUTH_COOKIE}=alice; Path=/2b/"))],
                    ajax(&format!(
                        "<script type=\"text/javascript\" reload=\"1\">if(typeof succeedhandle_ls{LOGINHASH}=='function') \
                         {{succeedhandle_ls{LOGINHASH}('forum.php', '欢迎您回来，alice', {{'username':'alice','usergroup':'','uid':'42','groupid':'10','syn':'0'}});}}</script>"
                    )),
                )
                    .into_response(),
                // accepted, but the response says nothing either way
                ("carol", "secret") => (
                    [(header::SET_COOKIE, format!("{AUTH_COOKIE}=carol; Path=/"))],
                    ajax(""),
                )
                    .into_response(),
                _ => ajax("登录失败，您还可以尝试 4 次"),
            }
        }
        "forum.php" => {
            if user.is_none() || field("formhash") != FORMHASH {
                return message("您需要先登录才能继续本操作");
            }
            match query.get("action").map(String::as_str) {
                Some("newthread") if field("subject").contains("违规") => {
                    message("抱歉，您填写的内容包含不良信息而无法提交")
                }
                Some("newthread") => {
                    Redirect::to(&format!("forum.php?mod=viewthread&tid={NEW_TOPIC_ID}&extra="))
                        .into_response()
                }
                Some("reply") => {
                    let tid = query.get("tid").cloned().unwrap_or_default();
                    Redirect::to(&format!(
                        "forum.php?mod=viewthread&tid={tid}&pid={NEW_POST_ID}&page=1&extra=#pid{NEW_POST_ID}"
                    ))
                    .into_response()
                }
                _ => (StatusCode::BAD_REQUEST, "bad request").into_response(),
            }
        }
        _ => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}

fn forum_get(state: &ForumState, query: &HashMap<String, String>, user: Option<&str>) -> Response {
    let q = |name: &str| query.get(name).map(String::as_str).unwrap_or_default();

    if q("gid") == "1" {
        let throttled = state
            .throttled_index_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if throttled {
            return message("刷新过于频繁，请 3 秒后再试");
        }
        return page(BOARD_INDEX);
    }

    match q("mod") {
        "forumdisplay" if q("fid") == "75" => page(TOPIC_LIST),
        "forumdisplay" => page(r#"<table id="threadlisttableid"></table><p>本版块或指定的范围内尚无主题</p>"#),
        "post" if user.is_none() => message("您需要先登录才能继续本操作"),
        "post" => {
            let mut hidden = format!(r#"<input type="hidden" name="formhash" value="{FORMHASH}" />"#);
            if !q("repquote").is_empty() {
                hidden.push_str(&format!(
                    r#"<input type="hidden" name="noticeauthor" value="auth{}" />
                       <input type="hidden" name="noticetrimstr" value="[quote]bob 发表于 2025-6-5[/quote]" />
                       <input type="hidden" name="noticeauthormsg" value="第一" />"#,
                    q("repquote")
                ));
            }
            page(format!(r#"<form id="postform" method="post">{hidden}</form>"#))
        }
        "viewthread" => page("<p>帖子</p>"),
        _ => {
            let mut body = user_bar(user);
            if user.is_some() {
                body.push_str(&format!(
                    r#"<input type="hidden" name="formhash" value="{FORMHASH}" />
                       <a href="plugin.php?id=dsu_paulsign:sign">签到</a>"#
                ));
            }
            page(body)
        }
    }
}

fn check_in(state: &ForumState, formhash: &str, user: Option<&str>) -> Response {
    if user.is_none() {
        return page("<p>请先登录后才能签到</p>");
    }
    if formhash != FORMHASH {
        return message("请求来路不明");
    }
    if state.check_ins.fetch_add(1, Ordering::SeqCst) == 0 {
        page(r#"<div class="c">签到成功，获得 金币 +2 经验 +5</div>"#)
    } else {
        page(r#"<div class="c">您今日已经签到过了，请明天再来</div>"#)
    }
}

fn post_block(id: u32, floor: u32, author: &str, body: &str) -> String {
    let label = match floor {
        1 => "楼主".to_string(),
        2 => "<em>沙发</em>".to_string(),
        3 => "<em>板凳</em>".to_string(),
        n => format!("<em>{n}</em>"),
    };
    format!(
        r#"<div id="post_{id}"><table><tr>
             <td class="pls"><div class="authi"><a href="space-uid-{id}.html" class="xw1">{author}</a></div></td>
             <td class="plc">
               <div class="pi"><strong><a href="forum.php?mod=redirect&amp;ptid={TOPIC_ID}&amp;pid={id}" id="postnum{id}">{label}</a></strong>
               <div class="authi"><em id="authorposton{id}">发表于 2025-6-5 10:{floor:02}</em></div></div>
               <table><tr><td class="t_f" id="postmessage_{id}">{body}</td></tr></table>
             </td></tr></table></div>"#
    )
}

fn topic_page(file: &str) -> Response {
    let mut parts = file.trim_start_matches("thread-").split('-');
    let tid = parts.next().unwrap_or_default();
    let requested: u32 = parts.next().and_then(|p| p.parse().ok()).unwrap_or(1);
    if tid != TOPIC_ID {
        return message("抱歉，指定的主题不存在或已被删除或正在被审核");
    }

    let total = 3;
    let current = requested.clamp(1, total);
    let posts = match current {
        1 => vec![
            post_block(100, 1, "alice", "开帖正文 https://www.example.com/a"),
            post_block(101, 2, "bob", "第一"),
            post_block(
                102,
                3,
                "carol",
                r#"<div class="quote"><blockquote><a href="forum.php?mod=redirect&amp;goto=findpost&amp;pid=101&amp;ptid=2265995">bob 发表于</a> 第一</blockquote></div>同意"#,
            ),
        ],
        2 => vec![post_block(103, 4, "dave", "第四"), post_block(104, 5, "erin", "第五")],
        _ => vec![post_block(105, 6, "frank", "最后")],
    };
    page(format!(
        r#"<div class="hm ptn"><span class="xg1">查看:</span> <span class="xi1">38628</span>
           <span class="pipe">|</span><span class="xg1">回复:</span> <span class="xi1">5</span></div>
           <h1 class="ts"><span id="thread_subject">测试主题</span></h1>
           <div class="pg"><strong>{current}</strong><label><span title="共 {total} 页"> / {total} 页</span></label></div>
           <div id="postlist">{}</div>"#,
        posts.join("\n")
    ))
}

const BOARD_INDEX: &str = r#"<div class="fl bm"><table class="fl_tb">
  <tr>
    <td class="fl_icn"></td>
    <td>
      <h2><a href="forum-75-1.html">游戏论坛</a><em class="xw0 xi1" title="今日"> (123)</em></h2>
      <p class="xg2">游戏综合讨论</p>
      <p>子版块: <a href="forum-4-1.html">掌机</a></p>
    </td>
    <td class="fl_i">20万 / 861万</td>
  </tr>
  <tr>
    <td class="fl_icn"></td>
    <td><h2><a href="forum-6-1.html">动漫论坛</a></h2></td>
    <td class="fl_i">2599 / 151万</td>
  </tr>
</table></div>"#;

const TOPIC_LIST: &str = r##"<table id="threadlisttableid">
  <tbody id="stickthread_100"><tr>
    <th><a href="thread-100-1-1.html" class="s xst">版规</a></th>
    <td class="by"><cite><a href="space-uid-1.html">admin</a></cite><em><span>2020-1-1</span></em></td>
    <td class="num"><a href="thread-100-1-1.html" class="xi2">5</a><em>9000</em></td>
    <td class="by"><cite><a href="space-uid-2.html">mod</a></cite><em><a href="#">2024-2-2 10:00</a></em></td>
  </tr></tbody>
  <tbody id="normalthread_2265995"><tr>
    <th><a href="thread-2265995-1-1.html" class="s xst">测试主题</a></th>
    <td class="by"><cite><a href="space-uid-42.html">alice</a></cite><em><span>2025-6-5</span></em></td>
    <td class="num"><a href="thread-2265995-1-1.html" class="xi2">5</a><em>38628</em></td>
    <td class="by"><cite><a href="space-uid-6.html">frank</a></cite><em><a href="#">2025-6-6 12:00</a></em></td>
  </tr></tbody>
</table>"##;

const SEARCH_RESULTS: &str = r#"<div id="threadlist"><ul>
  <li class="pbw" id="2265995">
    <h3 class="xs3"><a href="forum.php?mod=viewthread&amp;tid=2265995&amp;highlight=rust">学 <strong>Rust</strong></a></h3>
    <p class="xg1">5 个回复 - 38628 次查看</p>
    <p><span>2025-6-5</span> - <span><a href="space-uid-42.html">alice</a></span> - <span><a href="forum-75-1.html" class="xi1">游戏论坛</a></span></p>
  </li>
</ul></div>"#;
