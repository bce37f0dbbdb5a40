// A local stand-in for the bookstore, served with tiny_http.
//
// Every request URL is recorded so tests can count how often a page was
// fetched. Responses may be delayed; delayed responses are answered from
// their own thread so the server keeps serving other requests.

#![allow(dead_code)]

use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use kyobo_lookup::{Prefs, Settings, Site};

pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn html(body: impl Into<String>) -> Reply {
        Reply {
            status: 200,
            body: body.into().into_bytes(),
            content_type: "text/html; charset=utf-8",
            delay: None,
        }
    }

    /// HTML encoded and labelled as EUC-KR.
    pub fn euc_kr(body: &str) -> Reply {
        let (bytes, _, _) = encoding_rs::EUC_KR.encode(body);
        Reply {
            status: 200,
            body: bytes.into_owned(),
            content_type: "text/html; charset=euc-kr",
            delay: None,
        }
    }

    pub fn image(size: usize) -> Reply {
        Reply {
            status: 200,
            body: vec![0xAB; size],
            content_type: "image/jpeg",
            delay: None,
        }
    }

    pub fn not_found() -> Reply {
        Reply {
            status: 404,
            body: b"not found".to_vec(),
            content_type: "text/plain",
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Reply {
        self.delay = Some(delay);
        self
    }
}

pub struct Store {
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
    shutdown: mpsc::Sender<()>,
}

impl Store {
    /// `route` gets the request URL (path and query) and the base URL.
    pub fn spawn<F>(route: F) -> Store
    where
        F: Fn(&str, &str) -> Reply + Send + 'static,
    {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let (shutdown, shutdown_rx) = mpsc::channel::<()>();

        let seen = Arc::clone(&requests);
        let base = base_url.clone();
        thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            seen.lock().unwrap().push(url.clone());
            let reply = route(&url, &base);
            let delayed = reply.delay.is_some();

            let respond = move || {
                if let Some(delay) = reply.delay {
                    thread::sleep(delay);
                }
                let header =
                    tiny_http::Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()).unwrap();
                let response = tiny_http::Response::from_data(reply.body)
                    .with_status_code(reply.status)
                    .with_header(header);
                let _ = request.respond(response);
            };

            if delayed {
                thread::spawn(respond);
            } else {
                respond();
            }
        });

        Store {
            base_url,
            requests,
            shutdown,
        }
    }

    pub fn settings(&self, prefs: Prefs) -> Settings {
        Settings {
            prefs,
            site: Site {
                base_url: self.base_url.clone(),
                search_url: format!("{}/web/search?vPstrKeyWord=", self.base_url),
            },
        }
    }

    /// Number of recorded requests whose URL contains `needle`.
    pub fn hits(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|url| url.contains(needle))
            .count()
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// Search results page with one row per (title, barcode, author).
pub fn search_page(rows: &[(&str, &str, &str)]) -> String {
    let mut body = String::from(
        r#"<html><head><title>검색결과 - 인터넷교보문고</title></head><body><div class="list_search_result"><table>"#,
    );
    for (title, barcode, author) in rows {
        body.push_str(&format!(
            r#"<tr><td class="detail">
  <div class="title"><a href="/product/detailViewKor.laf?ejkGb=KOR&amp;mallGb=KOR&amp;barcode={barcode}&amp;orderClick=LAG"><strong>{title}</strong></a></div>
  <div class="author"><a href="/search?author=1">{author}</a> 저 | 창비</div>
</td></tr>"#
        ));
    }
    body.push_str("</table></div></body></html>");
    body
}

/// Product page in the store's layout.
pub fn detail_page(base_url: &str, title: &str, author: &str, isbn: &str) -> String {
    format!(
        r##"<html><head>
<title>{title} - 인터넷교보문고</title>
<meta property="og:image" content="{base_url}/images/book/xlarge/{isbn}.jpg"/>
</head><body>
<div class="title_icon">
  <h1 class="title">{title}</h1>
</div>
<div class="author">
  <span class="name"><a href="#">{author}</a></span> 지음
  <span class="line">|</span>
  <span title="출판사"><a href="/search?pub=1">창비</a></span>
  <span class="date">2011년 05월 02일 출간</span>
</div>
<a href="#review"><img alt="5점 만점에 5점" src="/star5.gif"/></a>
<div class="book_info_basic2">ISBN : {isbn} 언어 : 한국어</div>
<div class="book_info">
  <div class="belong_area"><ul class="locate"><li>국내도서 &gt; 역사/문화</li></ul></div>
  <dl class="book_info_detail"><dd class="content"><p>답사기</p></dd></dl>
</div>
</body></html>"##
    )
}

pub fn default_prefs() -> Prefs {
    Prefs::default()
}
