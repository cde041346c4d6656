use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// The 66 books in canonical order; a book's code is its 1-based position.
const KOREAN_BOOKS: [&str; 66] = [
    "창세기", "출애굽기", "레위기", "민수기", "신명기",
    "여호수아", "사사기", "룻기", "사무엘상", "사무엘하",
    "열왕기상", "열왕기하", "역대상", "역대하", "에스라",
    "느헤미야", "에스더", "욥기", "시편", "잠언",
    "전도서", "아가", "이사야", "예레미야", "예레미야애가",
    "에스겔", "다니엘", "호세아", "요엘", "아모스",
    "오바댜", "요나", "미가", "나훔", "하박국",
    "스바냐", "학개", "스가랴", "말라기",
    "마태복음", "마가복음", "누가복음", "요한복음", "사도행전",
    "로마서", "고린도전서", "고린도후서", "갈라디아서", "에베소서",
    "빌립보서", "골로새서", "데살로니가전서", "데살로니가후서",
    "디모데전서", "디모데후서", "디도서", "빌레몬서",
    "히브리서", "야고보서", "베드로전서", "베드로후서",
    "요한일서", "요한이서", "요한삼서", "유다서", "요한계시록",
];

// "호크마 주석, 창세기 01장 - 호크마 주석 - HANGL NOCR"
static COMMA_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^,]+),\s*([가-힣]+)\s*(\d+)장").unwrap());
static BOOK_CHAPTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([가-힣]+)\s*(\d+)장").unwrap());

/// Book and chapter declared by a scraped page's title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageTitle {
    pub commentary_name: Option<String>,
    pub book_name: String,
    pub chapter: u32,
}

/// Book names and their numeric codes. Built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct BookCatalog {
    names: Vec<&'static str>,
    codes: HashMap<&'static str, u8>,
}

impl BookCatalog {
    pub fn korean() -> Self {
        let names = KOREAN_BOOKS.to_vec();
        let codes = names
            .iter()
            .zip(1u8..)
            .map(|(&name, code)| (name, code))
            .collect();
        BookCatalog { names, codes }
    }

    pub fn code(&self, book_name: &str) -> Option<u8> {
        self.codes.get(book_name).copied()
    }

    pub fn contains(&self, book_name: &str) -> bool {
        self.codes.contains_key(book_name)
    }

    /// Books in canonical order with their codes.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &'static str)> + '_ {
        self.names.iter().zip(1u8..).map(|(&name, code)| (code, name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Extract book and chapter from a page title, e.g. `"호크마 주석, 창세기 01장"`.
    pub fn parse_title(&self, title: &str) -> Option<PageTitle> {
        if let Some(caps) = COMMA_TITLE_RE.captures(title) {
            if let Some(chapter) = self.known_chapter(&caps[2], &caps[3]) {
                let name = caps[1].trim();
                return Some(PageTitle {
                    commentary_name: (!name.is_empty()).then(|| name.to_string()),
                    book_name: caps[2].to_string(),
                    chapter,
                });
            }
        }

        BOOK_CHAPTER_RE.captures_iter(title).find_map(|caps| {
            let chapter = self.known_chapter(&caps[1], &caps[2])?;
            Some(PageTitle {
                commentary_name: None,
                book_name: caps[1].to_string(),
                chapter,
            })
        })
    }

    fn known_chapter(&self, book_name: &str, chapter: &str) -> Option<u32> {
        if !self.contains(book_name) {
            return None;
        }
        chapter.parse().ok().filter(|&c| c > 0)
    }
}
