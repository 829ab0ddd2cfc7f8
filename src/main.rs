use libc::STDIN_FILENO;
use std::cmp::Ordering;
use std::io::{self, BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::SystemTime;
use std::{env, error::Error, path::Path};
use std::{fs::File, path::PathBuf};
use termios::{
    Termios, BRKINT, CS8, ECHO, ICANON, ICRNL, IEXTEN, INPCK, ISIG, ISTRIP,
    IXON, OPOST, TCSAFLUSH, VMIN, VTIME,
};

use mred_error::EditorError;
use mred_ioctl::get_window_size_ioctl;

mod classify;
mod languages;
mod mred_error;
mod mred_ioctl;

use classify::Category;
use languages::{Syntax, HIGHLIGHT_NUMBERS, HIGHLIGHT_STRINGS, SYNTAXES};

pub const ESC: char = '\x1b';
pub const BACKSPACE: char = '\x7f';

const ESC_SEQ_RESET_CURSOR: &[u8] = b"\x1b[H";
const ESC_SEQ_CLEAR_SCREEN: &[u8] = b"\x1b[2J";
const ESC_SEQ_BOTTOM_RIGHT: &[u8] = b"\x1b[999C\x1b[999B";
const ESC_SEQ_QUERY_CURSOR: &[u8] = b"\x1b[6n";
const ESC_SEQ_HIDE_CURSOR: &[u8] = b"\x1b[?25l";
const ESC_SEQ_SHOW_CURSOR: &[u8] = b"\x1b[?25h";
const ESC_SEQ_CLEAR_LINE: &[u8] = b"\x1b[K";
const ESC_SEQ_INVERT_COLORS: &[u8] = b"\x1b[7m";
const ESC_SEQ_RESET_ALL: &[u8] = b"\x1b[m";
const ESC_SEQ_DEFAULT_COLOR: &[u8] = b"\x1b[39m";

fn esc_seq_move_cursor(pos_y: usize, pos_x: usize) -> Vec<u8> {
    format!("\x1b[{};{}H", pos_y, pos_x).into_bytes()
}

fn esc_seq_color(code: u8) -> Vec<u8> {
    format!("\x1b[{}m", code).into_bytes()
}

const MRED_VERSION: &str = env!("CARGO_PKG_VERSION");
const MRED_TAB_STOP: usize = 8;
const MRED_QUIT_TIMES: u8 = 3;
const MRED_STATUS_HEIGHT: usize = 2;

macro_rules! editor_status {
    ($editor:expr, $($arg:tt)*) => {
	$editor.set_status_message(format!($($arg)*));
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorKey {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Delete,
    PageUp,
    PageDown,
    Home,
    End,
    Ctrl(char),
    Meta(char),
    Other(char),
}

pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    /// Steps a row index with wraparound; `limit` is the last valid index.
    fn step(&self, value: usize, limit: usize) -> usize {
        match self {
            SearchDirection::Forward => {
                if value >= limit {
                    0
                } else {
                    value + 1
                }
            }
            SearchDirection::Backward => {
                if value == 0 {
                    limit
                } else {
                    value - 1
                }
            }
        }
    }
}

/// Per-cell rendering class of a row. `Normal` cells take the default
/// color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Highlight {
    Normal,
    Comment,
    Keyword,
    Builtin,
    Variable,
    Type,
    Constant,
    FunctionName,
    String,
    Number,
    Match,
}

impl Highlight {
    fn color(self) -> u8 {
        match self {
            Highlight::Normal => 39,
            Highlight::Comment => 36,
            Highlight::Keyword => 33,
            Highlight::Builtin => 94,
            Highlight::Variable => 96,
            Highlight::Type => 32,
            Highlight::Constant => 35,
            Highlight::FunctionName => 95,
            Highlight::String => 93,
            Highlight::Number => 31,
            Highlight::Match => 34,
        }
    }
}

fn highlight_for(category: Category) -> Highlight {
    match category {
        Category::FunctionName => Highlight::FunctionName,
        Category::Variable => Highlight::Variable,
        Category::Keyword => Highlight::Keyword,
        Category::Comment => Highlight::Comment,
        Category::Type => Highlight::Type,
        Category::Constant => Highlight::Constant,
        Category::Builtin => Highlight::Builtin,
    }
}

pub struct Row {
    pub line: Vec<char>,
    pub render: Vec<char>,
    pub highlights: Vec<Highlight>,
}

impl Row {
    pub fn empty() -> Row {
        Row {
            line: vec![],
            render: vec![],
            highlights: vec![],
        }
    }
}

impl Default for Row {
    fn default() -> Self {
        Row::empty()
    }
}

pub struct Editor<'i, 'o> {
    pub original_termios: Option<Termios>,
    pub cursor_x: usize,
    pub cursor_y: usize,
    pub render_x: usize,
    pub screen_rows: usize,
    pub screen_cols: usize,
    pub editor_cols: usize,
    pub row_offset: usize,
    pub col_offset: usize,
    pub rows: Vec<Row>,
    pub file: Option<PathBuf>,
    pub status_msg: String,
    pub status_time: SystemTime,
    pub dirty: bool,
    pub quit_times: u8,
    pub search_dir: SearchDirection,
    pub last_match: Option<usize>,
    pub win_changed: Arc<AtomicBool>,
    pub stored_hl: Option<(usize, Vec<Highlight>)>,
    pub syntax: Option<&'static Syntax>,
    pub mark: Option<(usize, usize)>,
    pub clipboard: String,
    pub stdin: Box<dyn Read + 'i>,
    pub stdout: Box<dyn Write + 'o>,
}

pub fn row_cursor_to_render(row: &Row, cursor_x: usize) -> usize {
    let mut render_x = 0;

    for &c in row.line.iter().take(cursor_x) {
        if c == '\t' {
            render_x += (MRED_TAB_STOP - 1) - (render_x % MRED_TAB_STOP);
        }
        render_x += 1;
    }

    render_x
}

pub fn row_render_to_cursor(row: &Row, render_x: usize) -> usize {
    let mut current = 0;

    for (cursor_x, &c) in row.line.iter().enumerate() {
        if c == '\t' {
            current += (MRED_TAB_STOP - 1) - (current % MRED_TAB_STOP);
        }
        current += 1;

        if current > render_x {
            return cursor_x;
        }
    }

    row.line.len()
}

fn get_cursor_position() -> Result<(usize, usize), Box<dyn Error>> {
    let mut stdout = io::stdout();
    let mut stdin = io::stdin();
    stdout.write_all(ESC_SEQ_QUERY_CURSOR)?;
    stdout.flush()?;

    let mut c = [0; 1];
    let mut response = String::new();

    loop {
        stdin.read_exact(&mut c)?;
        if c[0] == b'R' {
            break;
        } else {
            response.push(c[0] as char);
        }
    }

    if !response.starts_with("\x1b[") || response.len() <= 2 {
        return Err(Box::new(EditorError::ParseGetCursorResponse));
    }

    let pos: Result<Vec<usize>, _> =
        response[2..].split(';').map(str::parse::<usize>).collect();

    match pos?.as_slice() {
        [row, col] => Ok((*row, *col)),
        _ => Err(Box::new(EditorError::ParseGetCursorResponse)),
    }
}

fn get_window_size() -> Result<(usize, usize), Box<dyn Error>> {
    if let Ok(size) = get_window_size_ioctl() {
        return Ok(size);
    }

    let mut stdout = io::stdout();

    stdout.write_all(ESC_SEQ_BOTTOM_RIGHT)?;
    stdout.flush()?;

    get_cursor_position()
}

fn enable_raw_mode() -> Result<(), Box<dyn Error>> {
    let mut attr = Termios::from_fd(STDIN_FILENO)?;
    attr.c_iflag &= !(BRKINT | ICRNL | INPCK | ISTRIP | IXON);
    attr.c_oflag &= !(OPOST);
    attr.c_cflag |= CS8;
    attr.c_lflag &= !(ECHO | ICANON | IEXTEN | ISIG);
    attr.c_cc[VMIN] = 0;
    attr.c_cc[VTIME] = 1;
    termios::tcsetattr(STDIN_FILENO, TCSAFLUSH, &attr)?;

    Ok(())
}

fn is_separator(c: char) -> bool {
    !(c.is_ascii_alphanumeric() || c == '_' || c == '@' || c == '.')
}

impl<'i, 'o> Editor<'i, 'o> {
    fn new() -> Result<Editor<'static, 'static>, Box<dyn Error>> {
        let original = Termios::from_fd(STDIN_FILENO)?;
        enable_raw_mode()?;
        let (rows, cols) = get_window_size()?;

        let win_changed = Arc::new(AtomicBool::new(false));
        signal_hook::flag::register(
            signal_hook::consts::SIGWINCH,
            Arc::clone(&win_changed),
        )?;

        Ok(Editor {
            original_termios: Some(original),
            cursor_x: 0,
            cursor_y: 0,
            render_x: 0,
            screen_rows: rows - MRED_STATUS_HEIGHT,
            screen_cols: cols,
            editor_cols: cols,
            row_offset: 0,
            col_offset: 0,
            rows: vec![],
            file: None,
            status_msg: String::new(),
            status_time: SystemTime::UNIX_EPOCH,
            dirty: false,
            quit_times: MRED_QUIT_TIMES,
            search_dir: SearchDirection::Forward,
            last_match: None,
            win_changed,
            stored_hl: None,
            syntax: None,
            mark: None,
            clipboard: String::new(),
            stdin: Box::new(io::stdin()),
            stdout: Box::new(io::stdout()),
        })
    }

    pub fn set_status_message(&mut self, msg: String) {
        self.status_msg = msg;
        self.status_time = SystemTime::now();
    }

    fn select_syntax(&mut self, path: &Path) {
        let name = path.to_string_lossy();
        self.syntax = SYNTAXES.iter().find(|syntax| {
            syntax.extensions.iter().any(|ext| name.ends_with(ext))
        });
    }

    pub fn open(&mut self, file_path: &Path) -> Result<(), Box<dyn Error>> {
        self.select_syntax(file_path);

        match File::open(file_path) {
            Ok(file) => {
                let reader = BufReader::new(file);
                for line in reader.lines() {
                    let line = line?
                        .trim_end_matches(|c| c == '\n' || c == '\r')
                        .chars()
                        .collect();
                    self.rows.push(Row {
                        line,
                        render: vec![],
                        highlights: vec![],
                    });
                    let y = self.rows.len() - 1;
                    self.update_row(y);
                    self.update_syntax(y);
                }
            }
            // opening a missing file starts a fresh buffer under that name
            Err(e) if e.kind() == ErrorKind::NotFound => (),
            Err(e) => return Err(Box::new(e)),
        }

        self.file = Some(file_path.to_owned());

        Ok(())
    }

    fn write_rows(
        &self,
        output: &mut impl Write,
    ) -> Result<usize, Box<dyn Error>> {
        let mut bytes = 0;
        for row in &self.rows {
            for c in &row.line {
                bytes += output.write(c.to_string().as_bytes())?;
            }
            bytes += output.write(b"\n")?;
        }

        Ok(bytes)
    }

    pub fn save(&mut self) -> Result<(), Box<dyn Error>> {
        if self.file.is_none() {
            match self.prompt("Save as (ESC to cancel)", None)? {
                Some(file) => {
                    let path = PathBuf::from(file);
                    self.select_syntax(&path);
                    self.file = Some(path);
                    for y in 0..self.rows.len() {
                        self.update_syntax(y);
                    }
                }
                None => {
                    editor_status!(self, "Save aborted");
                    return Ok(());
                }
            }
        }

        self.dirty = false;
        let result = match &self.file {
            Some(path) => File::create(path).and_then(|file| {
                let mut file = BufWriter::new(file);
                match self.write_rows(&mut file) {
                    Ok(bytes) => Ok(bytes),
                    Err(e) => Err(io::Error::new(ErrorKind::Other, e.to_string())),
                }
            }),
            None => return Ok(()),
        };

        match result {
            Ok(bytes) => {
                editor_status!(self, "{} bytes written to disk", bytes);
            }
            Err(msg) => {
                editor_status!(self, "Can't save! I/O error: {}", msg);
            }
        }

        Ok(())
    }

    pub fn update_row(&mut self, y: usize) {
        let row = &mut self.rows[y];
        row.render.clear();
        let mut idx = 0;
        for &c in row.line.iter() {
            if c == '\t' {
                row.render.push(' ');
                idx += 1;
                while idx % MRED_TAB_STOP != 0 {
                    row.render.push(' ');
                    idx += 1;
                }
            } else {
                row.render.push(c);
                idx += 1;
            }
        }
    }

    /// Recomputes the per-cell highlighting of one row from the rule table
    /// of the active language, then overlays the generic string and number
    /// fontification the language's flags ask for.
    pub fn update_syntax(&mut self, y: usize) {
        let render_len = self.rows[y].render.len();

        let syntax = match self.syntax {
            Some(syntax) => syntax,
            None => {
                self.rows[y].highlights =
                    vec![Highlight::Normal; render_len];
                return;
            }
        };

        let render = &self.rows[y].render;
        let mut highlights = vec![Highlight::Normal; render_len];

        for annotation in syntax.rules().classify(render) {
            let highlight = highlight_for(annotation.category);
            for cell in &mut highlights[annotation.start..annotation.end] {
                *cell = highlight;
            }
        }

        if syntax.flags & HIGHLIGHT_STRINGS != 0 {
            let mut i = 0;
            while i < render_len {
                if highlights[i] == Highlight::Normal && render[i] == '"' {
                    highlights[i] = Highlight::String;
                    i += 1;
                    while i < render_len
                        && highlights[i] == Highlight::Normal
                    {
                        highlights[i] = Highlight::String;
                        i += 1;
                        if render[i - 1] == '"' {
                            break;
                        }
                    }
                } else {
                    i += 1;
                }
            }
        }

        if syntax.flags & HIGHLIGHT_NUMBERS != 0 {
            let mut i = 0;
            while i < render_len {
                let separated = i == 0 || is_separator(render[i - 1]);
                if highlights[i] == Highlight::Normal
                    && render[i].is_ascii_digit()
                    && separated
                {
                    while i < render_len
                        && highlights[i] == Highlight::Normal
                        && (render[i].is_ascii_digit() || render[i] == '.')
                    {
                        highlights[i] = Highlight::Number;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
        }

        self.rows[y].highlights = highlights;
    }

    fn touch_row(&mut self, y: usize) {
        self.update_row(y);
        self.update_syntax(y);
    }

    fn insert_char(&mut self, c: char) {
        if self.cursor_y == self.rows.len() {
            self.rows.push(Row::empty());
        }

        let row = &mut self.rows[self.cursor_y];
        let at = self.cursor_x.min(row.line.len());
        row.line.insert(at, c);
        self.touch_row(self.cursor_y);

        self.cursor_x += 1;
        self.dirty = true;
    }

    fn insert_newline(&mut self) {
        if self.cursor_x == 0 {
            self.rows.insert(self.cursor_y, Row::empty());
        } else if let Some(current_row) = self.rows.get_mut(self.cursor_y) {
            let next_line = current_row.line[self.cursor_x..].to_vec();
            current_row.line.truncate(self.cursor_x);
            self.rows.insert(
                self.cursor_y + 1,
                Row {
                    line: next_line,
                    render: vec![],
                    highlights: vec![],
                },
            );
            self.touch_row(self.cursor_y);
            self.touch_row(self.cursor_y + 1);
        }

        self.cursor_y += 1;
        self.cursor_x = 0;
        self.dirty = true;
    }

    fn delete_char(&mut self) {
        if self.cursor_x == 0 && self.cursor_y == 0 {
            return;
        }

        if self.cursor_y < self.rows.len() {
            if self.cursor_x > 0 {
                let row = &mut self.rows[self.cursor_y];
                if self.cursor_x <= row.line.len() {
                    row.line.remove(self.cursor_x - 1);
                    self.touch_row(self.cursor_y);
                }
                self.cursor_x -= 1;
                self.dirty = true;
            } else {
                let line = std::mem::take(&mut self.rows[self.cursor_y].line);
                let prev_row = &mut self.rows[self.cursor_y - 1];
                self.cursor_x = prev_row.line.len();
                prev_row.line.extend_from_slice(&line);
                self.touch_row(self.cursor_y - 1);
                self.rows.remove(self.cursor_y);
                self.cursor_y -= 1;
                self.dirty = true;
            }
        } else if self.cursor_y == self.rows.len() {
            // NOTE: we are in the last empty line -> nothing to delete
            self.cursor_y -= 1;
            self.cursor_x = self.rows[self.cursor_y].line.len();
        }
    }

    fn copy_region(&mut self) {
        let (mark_x, mark_y) = match self.mark {
            Some(mark) => mark,
            None => {
                editor_status!(self, "No mark set");
                return;
            }
        };

        let cursor = (self.cursor_y, self.cursor_x);
        let mark = (mark_y, mark_x);
        let ((start_y, start_x), (end_y, end_x)) = if mark <= cursor {
            (mark, cursor)
        } else {
            (cursor, mark)
        };

        let mut text = String::new();
        for y in start_y..=end_y {
            let row = match self.rows.get(y) {
                Some(row) => row,
                None => break,
            };
            let from = if y == start_y { start_x } else { 0 };
            let to = if y == end_y {
                end_x.min(row.line.len())
            } else {
                row.line.len()
            };
            if y != start_y {
                text.push('\n');
            }
            text.extend(row.line[from.min(to)..to].iter());
        }

        editor_status!(self, "Copied {} characters", text.chars().count());
        self.clipboard = text;
    }

    fn paste(&mut self) {
        let text = self.clipboard.clone();
        for c in text.chars() {
            if c == '\n' {
                self.insert_newline();
            } else {
                self.insert_char(c);
            }
        }
    }

    fn read_byte(&mut self) -> Result<Option<u8>, Box<dyn Error>> {
        let mut byte = [0; 1];
        if self.stdin.read(&mut byte)? == 1 {
            Ok(Some(byte[0]))
        } else {
            Ok(None)
        }
    }

    fn read_utf8_char(&mut self, first: u8) -> Result<char, Box<dyn Error>> {
        let len = match first {
            b if b & 0xe0 == 0xc0 => 2,
            b if b & 0xf0 == 0xe0 => 3,
            b if b & 0xf8 == 0xf0 => 4,
            _ => return Err(Box::new(EditorError::InvalidUtf8Input)),
        };

        let mut bytes = [first, 0, 0, 0];
        self.stdin.read_exact(&mut bytes[1..len])?;

        match std::str::from_utf8(&bytes[..len]) {
            Ok(s) => match s.chars().next() {
                Some(c) => Ok(c),
                None => Err(Box::new(EditorError::InvalidUtf8Input)),
            },
            Err(_) => Err(Box::new(EditorError::InvalidUtf8Input)),
        }
    }

    pub fn read_key(&mut self) -> Result<EditorKey, Box<dyn Error>> {
        let first = match self.read_byte()? {
            Some(byte) => byte,
            // read timeout in raw mode, treated like a bare escape
            None => return Ok(EditorKey::Other(ESC)),
        };

        match first {
            0x1b => self.read_escape_sequence(),
            0x00 => Ok(EditorKey::Ctrl(' ')),
            0x01..=0x1a => {
                Ok(EditorKey::Ctrl((first - 1 + b'a') as char))
            }
            0x1c..=0x1f => Ok(EditorKey::Other(first as char)),
            b if b == BACKSPACE as u8 => Ok(EditorKey::Other(BACKSPACE)),
            b if b < 0x80 => Ok(EditorKey::Other(first as char)),
            _ => Ok(EditorKey::Other(self.read_utf8_char(first)?)),
        }
    }

    fn read_escape_sequence(&mut self) -> Result<EditorKey, Box<dyn Error>> {
        let first = match self.read_byte()? {
            Some(byte) => byte,
            None => return Ok(EditorKey::Other(ESC)),
        };

        if first != b'[' && first != b'O' {
            return Ok(EditorKey::Meta(first as char));
        }

        let second = match self.read_byte()? {
            Some(byte) => byte,
            None => return Ok(EditorKey::Other(ESC)),
        };

        match (first, second) {
            (b'[', b'A') => Ok(EditorKey::ArrowUp),
            (b'[', b'B') => Ok(EditorKey::ArrowDown),
            (b'[', b'C') => Ok(EditorKey::ArrowRight),
            (b'[', b'D') => Ok(EditorKey::ArrowLeft),
            (b'[', b'H') | (b'O', b'H') => Ok(EditorKey::Home),
            (b'[', b'F') | (b'O', b'F') => Ok(EditorKey::End),
            (b'[', digit) if digit.is_ascii_digit() => {
                match self.read_byte()? {
                    Some(b'~') => match digit {
                        b'1' | b'7' => Ok(EditorKey::Home),
                        b'3' => Ok(EditorKey::Delete),
                        b'4' | b'8' => Ok(EditorKey::End),
                        b'5' => Ok(EditorKey::PageUp),
                        b'6' => Ok(EditorKey::PageDown),
                        _ => Ok(EditorKey::Other(ESC)),
                    },
                    _ => Ok(EditorKey::Other(ESC)),
                }
            }
            _ => Ok(EditorKey::Other(ESC)),
        }
    }

    pub fn prompt(
        &mut self,
        prompt: &str,
        callback: Option<fn(&mut Self, &[char], EditorKey)>,
    ) -> Result<Option<String>, Box<dyn Error>> {
        let mut str_input = String::new();
        let mut vec_input = vec![];
        let callback = match callback {
            Some(f) => f,
            None => |_: &mut Self, _: &[char], _: EditorKey| {},
        };

        loop {
            editor_status!(self, "{}: {}", prompt, str_input);
            self.refresh_screen()?;

            let key = self.read_key()?;
            match key {
                EditorKey::Delete
                | EditorKey::Other(BACKSPACE)
                | EditorKey::Ctrl('h') => {
                    str_input.pop();
                    vec_input.pop();
                }
                EditorKey::Other(ESC) => {
                    editor_status!(self, "");
                    callback(self, &vec_input, key);
                    return Ok(None);
                }
                EditorKey::Ctrl('m') if !str_input.is_empty() => {
                    editor_status!(self, "");
                    callback(self, &vec_input, key);
                    return Ok(Some(str_input));
                }
                EditorKey::Other(c) if !c.is_control() => {
                    str_input.push(c);
                    vec_input.push(c);
                }
                _ => (),
            }

            callback(self, &vec_input, key);
        }
    }

    fn find_callback(&mut self, needle: &[char], key: EditorKey) {
        if let Some((y, saved)) = self.stored_hl.take() {
            if let Some(row) = self.rows.get_mut(y) {
                row.highlights = saved;
            }
        }

        if needle.is_empty() {
            return;
        }

        match key {
            EditorKey::Ctrl('m') | EditorKey::Other(ESC) => {
                self.last_match = None;
                self.search_dir = SearchDirection::Forward;
                return;
            }
            EditorKey::ArrowRight
            | EditorKey::ArrowDown
            | EditorKey::Ctrl('f') => {
                self.search_dir = SearchDirection::Forward;
            }
            EditorKey::ArrowLeft | EditorKey::ArrowUp => {
                self.search_dir = SearchDirection::Backward;
            }
            _ => {
                self.last_match = None;
                self.search_dir = SearchDirection::Forward;
            }
        }

        if self.last_match.is_none() {
            self.search_dir = SearchDirection::Forward;
        }

        if self.rows.is_empty() {
            return;
        }

        let mut search_idx = self.last_match.unwrap_or(self.rows.len());

        for _ in 0..self.rows.len() {
            search_idx =
                self.search_dir.step(search_idx, self.rows.len() - 1);

            let row = self
                .rows
                .get(search_idx)
                .expect("search index should always be valid!");

            if let Some(idx) =
                row.line.windows(needle.len()).position(|hay| hay == needle)
            {
                self.last_match = Some(search_idx);
                self.cursor_y = search_idx;
                self.cursor_x = idx;
                self.row_offset = self.rows.len();

                let match_start = row_cursor_to_render(row, idx);
                let match_end =
                    row_cursor_to_render(row, idx + needle.len());
                let row = &mut self.rows[search_idx];
                self.stored_hl =
                    Some((search_idx, row.highlights.clone()));
                for cell in &mut row.highlights[match_start..match_end] {
                    *cell = Highlight::Match;
                }
                break;
            }
        }
    }

    pub fn find(&mut self) -> Result<(), Box<dyn Error>> {
        let saved_cx = self.cursor_x;
        let saved_cy = self.cursor_y;
        let saved_coloff = self.col_offset;
        let saved_rowoff = self.row_offset;

        let input = self
            .prompt("Search (ESC/Arrows/Enter)", Some(Self::find_callback))?;
        if input.is_none() {
            self.cursor_x = saved_cx;
            self.cursor_y = saved_cy;
            self.col_offset = saved_coloff;
            self.row_offset = saved_rowoff;
        }

        Ok(())
    }

    fn move_cursor(&mut self, key: EditorKey) {
        match key {
            EditorKey::ArrowLeft => {
                if self.cursor_x > 0 {
                    self.cursor_x -= 1;
                } else if self.cursor_y > 0 {
                    self.cursor_y -= 1;
                    if let Some(row) = self.rows.get(self.cursor_y) {
                        self.cursor_x = row.line.len();
                    }
                }
            }
            EditorKey::ArrowRight => {
                if let Some(row) = self.rows.get(self.cursor_y) {
                    match self.cursor_x.cmp(&row.line.len()) {
                        Ordering::Less => self.cursor_x += 1,
                        Ordering::Equal => {
                            self.cursor_x = 0;
                            self.cursor_y += 1;
                        }
                        Ordering::Greater => {}
                    }
                }
            }
            EditorKey::ArrowUp if self.cursor_y > 0 => self.cursor_y -= 1,
            EditorKey::ArrowDown if self.cursor_y < self.rows.len() => {
                self.cursor_y += 1
            }
            _ => (),
        }

        if let Some(row) = self.rows.get(self.cursor_y) {
            self.cursor_x = self.cursor_x.clamp(0, row.line.len());
        } else {
            self.cursor_x = 0;
        }
    }

    fn move_word(&mut self, forward: bool) {
        let step = if forward {
            EditorKey::ArrowRight
        } else {
            EditorKey::ArrowLeft
        };

        let at_word = |editor: &Editor| -> bool {
            let row = match editor.rows.get(editor.cursor_y) {
                Some(row) => row,
                None => return false,
            };
            let x = if forward {
                editor.cursor_x
            } else {
                match editor.cursor_x.checked_sub(1) {
                    Some(x) => x,
                    None => return false,
                }
            };
            row.line
                .get(x)
                .map(|&c| c.is_alphanumeric() || c == '_')
                .unwrap_or(false)
        };

        let at_buffer_edge = |editor: &Editor| -> bool {
            if forward {
                editor.cursor_y >= editor.rows.len()
            } else {
                editor.cursor_y == 0 && editor.cursor_x == 0
            }
        };

        while !at_buffer_edge(self) && !at_word(self) {
            self.move_cursor(step);
        }
        while !at_buffer_edge(self) && at_word(self) {
            self.move_cursor(step);
        }
    }

    pub fn process_keypress(
        &mut self,
        key: EditorKey,
    ) -> Result<bool, Box<dyn Error>> {
        match key {
            EditorKey::Ctrl('m') => {
                self.insert_newline();
            }
            EditorKey::Ctrl('q') => {
                if self.dirty && self.quit_times > 0 {
                    editor_status!(
                        self,
                        "WARNING!!! File has unsaved changes. \
                         Press Ctrl-Q {} more times to quit.",
                        self.quit_times
                    );
                    self.quit_times -= 1;
                    return Ok(true);
                } else {
                    clear_screen(&mut self.stdout)?;
                    return Ok(false);
                }
            }
            EditorKey::Ctrl('s') => {
                self.save()?;
            }
            EditorKey::Ctrl('f') => self.find()?,
            EditorKey::Ctrl('i') => {
                self.insert_char('\t');
            }
            EditorKey::Ctrl(' ') => {
                self.mark = Some((self.cursor_x, self.cursor_y));
                editor_status!(self, "Mark set");
            }
            EditorKey::Ctrl('c') => {
                self.copy_region();
            }
            EditorKey::Ctrl('v') => {
                self.paste();
            }
            EditorKey::Home | EditorKey::Ctrl('a') => {
                self.cursor_x = 0;
            }
            EditorKey::End | EditorKey::Ctrl('e') => {
                if let Some(row) = self.rows.get(self.cursor_y) {
                    self.cursor_x = row.line.len();
                }
            }
            EditorKey::Delete
            | EditorKey::Other(BACKSPACE)
            | EditorKey::Ctrl('h') => {
                if key == EditorKey::Delete {
                    self.move_cursor(EditorKey::ArrowRight);
                }
                self.delete_char();
            }
            EditorKey::PageUp | EditorKey::PageDown => {
                if key == EditorKey::PageUp {
                    self.cursor_y = self.row_offset;
                } else {
                    self.cursor_y = usize::clamp(
                        self.row_offset + self.screen_rows - 1,
                        0,
                        self.rows.len(),
                    );
                }

                for _ in 0..self.screen_rows {
                    self.move_cursor(if key == EditorKey::PageUp {
                        EditorKey::ArrowUp
                    } else {
                        EditorKey::ArrowDown
                    })
                }
            }
            EditorKey::ArrowLeft
            | EditorKey::ArrowRight
            | EditorKey::ArrowUp
            | EditorKey::ArrowDown => {
                self.move_cursor(key);
            }
            EditorKey::Meta('f') => self.move_word(true),
            EditorKey::Meta('b') => self.move_word(false),
            EditorKey::Other(ESC) | EditorKey::Ctrl('l') => (),
            EditorKey::Other(c) if !c.is_control() => {
                self.insert_char(c);
            }
            _ => (),
        }

        self.quit_times = MRED_QUIT_TIMES;
        Ok(true)
    }

    fn scroll(&mut self) {
        self.render_x = 0;
        if let Some(row) = self.rows.get(self.cursor_y) {
            self.render_x = row_cursor_to_render(row, self.cursor_x);
        }

        if self.cursor_y < self.row_offset {
            self.row_offset = self.cursor_y;
        }
        if self.cursor_y >= self.row_offset + self.screen_rows {
            self.row_offset = self.cursor_y - self.screen_rows + 1;
        }
        if self.render_x < self.col_offset {
            self.col_offset = self.render_x;
        }
        if self.render_x >= self.col_offset + self.editor_cols {
            self.col_offset = self.render_x - self.editor_cols + 1;
        }
    }

    fn draw_rows(
        &self,
        dest: &mut impl Write,
    ) -> Result<(), Box<dyn Error>> {
        for y in 0..self.screen_rows {
            let filerow = y + self.row_offset;
            if filerow >= self.rows.len() {
                if self.rows.is_empty() && y == self.screen_rows / 3 {
                    let mut welcome_msg =
                        format!("mred editor -- version {}", MRED_VERSION);
                    welcome_msg.truncate(self.screen_cols);

                    let mut padding =
                        (self.screen_cols - welcome_msg.len()) / 2;
                    if padding > 0 {
                        dest.write_all(b"~")?;
                        padding -= 1;
                    }

                    while padding > 0 {
                        dest.write_all(b" ")?;
                        padding -= 1;
                    }

                    dest.write_all(&welcome_msg.into_bytes())?;
                } else {
                    dest.write_all(b"~")?;
                }
            } else {
                let row = &self.rows[filerow];
                let start = self.col_offset.min(row.render.len());
                let end =
                    (self.col_offset + self.editor_cols).min(row.render.len());

                let mut current = Highlight::Normal;
                dest.write_all(ESC_SEQ_DEFAULT_COLOR)?;

                for i in start..end {
                    let highlight = row
                        .highlights
                        .get(i)
                        .copied()
                        .unwrap_or(Highlight::Normal);
                    if highlight != current {
                        dest.write_all(&esc_seq_color(highlight.color()))?;
                        current = highlight;
                    }

                    let mut encoded = [0; 4];
                    dest.write_all(
                        row.render[i].encode_utf8(&mut encoded).as_bytes(),
                    )?;
                }

                dest.write_all(ESC_SEQ_DEFAULT_COLOR)?;
            }
            dest.write_all(ESC_SEQ_CLEAR_LINE)?;
            dest.write_all(b"\r\n")?;
        }

        Ok(())
    }

    pub fn draw_status_bar(
        &self,
        dest: &mut impl Write,
    ) -> Result<(), Box<dyn Error>> {
        dest.write_all(ESC_SEQ_INVERT_COLORS)?;

        let file_name = match &self.file {
            Some(path) => path.to_string_lossy().to_string(),
            None => "[No Name]".to_string(),
        };

        let mut status_left = format!(
            "{:.20} - {} lines {}",
            file_name,
            self.rows.len(),
            if self.dirty { "(modified)" } else { "" }
        );
        status_left.truncate(self.screen_cols);
        dest.write_all(status_left.as_bytes())?;

        let file_type = match self.syntax {
            Some(syntax) => syntax.name,
            None => "no ft",
        };
        let status_right = format!(
            "{} | {}/{}",
            file_type,
            self.cursor_y + 1,
            self.rows.len()
        );

        for len in status_left.len()..self.screen_cols {
            if self.screen_cols - len == status_right.len() {
                dest.write_all(status_right.as_bytes())?;
                break;
            } else {
                dest.write_all(b" ")?;
            }
        }

        dest.write_all(ESC_SEQ_RESET_ALL)?;
        dest.write_all(b"\r\n")?;

        Ok(())
    }

    fn draw_message_bar(
        &self,
        dest: &mut impl Write,
    ) -> Result<(), Box<dyn Error>> {
        dest.write_all(ESC_SEQ_CLEAR_LINE)?;
        let mut msg = self.status_msg.clone();
        msg.truncate(self.screen_cols);
        let now = SystemTime::now();

        if !msg.is_empty()
            && now.duration_since(self.status_time)?.as_secs() < 5
        {
            dest.write_all(msg.as_bytes())?;
        }

        Ok(())
    }

    fn handle_window_change(&mut self) {
        if !self
            .win_changed
            .swap(false, std::sync::atomic::Ordering::Relaxed)
        {
            return;
        }

        if let Ok((rows, cols)) = get_window_size_ioctl() {
            self.screen_rows = rows.saturating_sub(MRED_STATUS_HEIGHT);
            self.screen_cols = cols;
            self.editor_cols = cols;
        }
    }

    pub fn refresh_screen(&mut self) -> Result<(), Box<dyn Error>> {
        self.handle_window_change();

        let mut buffer = vec![];

        self.scroll();

        buffer.write_all(ESC_SEQ_HIDE_CURSOR)?;
        buffer.write_all(ESC_SEQ_RESET_CURSOR)?;

        self.draw_rows(&mut buffer)?;
        self.draw_status_bar(&mut buffer)?;
        self.draw_message_bar(&mut buffer)?;

        buffer.write_all(&esc_seq_move_cursor(
            (self.cursor_y - self.row_offset) + 1,
            (self.render_x - self.col_offset) + 1,
        ))?;

        buffer.write_all(ESC_SEQ_SHOW_CURSOR)?;

        self.stdout.write_all(&buffer)?;
        self.stdout.flush()?;

        Ok(())
    }
}

impl<'i, 'o> Drop for Editor<'i, 'o> {
    fn drop(&mut self) {
        // NOTE: Don't panic while dropping!
        if let Some(original) = &self.original_termios {
            if let Err(e) =
                termios::tcsetattr(STDIN_FILENO, TCSAFLUSH, original)
            {
                eprintln!("tcsetattr error: {}", e)
            }
        }
    }
}

fn clear_screen(dest: &mut impl Write) -> Result<(), Box<dyn Error>> {
    dest.write_all(ESC_SEQ_CLEAR_SCREEN)?;
    dest.write_all(ESC_SEQ_RESET_CURSOR)?;
    dest.flush()?;

    Ok(())
}

fn run(editor: &mut Editor) -> Result<(), Box<dyn Error>> {
    loop {
        editor.refresh_screen()?;
        let key = editor.read_key()?;
        if !editor.process_keypress(key)? {
            break;
        }
    }

    Ok(())
}

fn main() {
    let mut editor = match Editor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("initialization error: {}", e);
            std::process::exit(1);
        }
    };

    let args = env::args().collect::<Vec<_>>();
    if let [_prog, filename] = args.as_slice() {
        if let Err(e) = editor.open(Path::new(&filename)) {
            drop(editor);
            eprintln!("open failed: {}", e);
            std::process::exit(1);
        }
    }

    editor_status!(
        editor,
        "HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find"
    );

    if let Err(e) = run(&mut editor) {
        let _ = clear_screen(&mut io::stdout());
        eprintln!("error: {}", e)
    }
}

#[cfg(test)]
mod tests;
