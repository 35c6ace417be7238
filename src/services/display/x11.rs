use crate::error::{AutolockError, Result};
use crate::events::{DisplayEvent, EventInterest, KeyPressClaims, TreeInfo, WindowId};
use crate::trace_if_enabled;
use tracing::{debug, info};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{
    AtomEnum, ChangeWindowAttributesAux, ConnectionExt as _, EventMask, PropMode,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use super::r#trait::{Atom, DisplayClient};

/// Бит в response_type, которым сервер помечает события от SendEvent
const SEND_EVENT_BIT: u8 = 0x80;

pub struct X11Display {
    conn: RustConnection,
    roots: Vec<WindowId>,
    default_root: WindowId,
}

impl X11Display {
    pub fn connect(display_name: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display_name)?;
        let roots: Vec<WindowId> = conn.setup().roots.iter().map(|screen| screen.root).collect();
        let default_root = roots.get(screen_num).copied().ok_or_else(|| {
            AutolockError::Internal(format!("Экран {} отсутствует на X-сервере", screen_num))
        })?;

        info!(
            "Подключено к X-серверу: экранов {}, экран по умолчанию {}",
            roots.len(),
            screen_num
        );

        Ok(Self { conn, roots, default_root })
    }

    /// Окно успело исчезнуть: сервер ответил ошибкой протокола, а не разрывом связи
    fn vanished<T>(window: WindowId, err: ReplyError) -> Result<Option<T>> {
        match err {
            ReplyError::X11Error(e) => {
                trace_if_enabled!("Окно 0x{:x} исчезло во время запроса: {:?}", window, e.error_kind);
                Ok(None)
            }
            other => Err(other.into()),
        }
    }
}

impl DisplayClient for X11Display {
    fn roots(&self) -> Vec<WindowId> {
        self.roots.clone()
    }

    fn default_root(&self) -> WindowId {
        self.default_root
    }

    fn query_tree(&self, window: WindowId) -> Result<Option<TreeInfo>> {
        match self.conn.query_tree(window)?.reply() {
            Ok(reply) => Ok(Some(TreeInfo {
                parent: (reply.parent != x11rb::NONE).then_some(reply.parent),
                children: reply.children,
            })),
            Err(e) => Self::vanished(window, e),
        }
    }

    fn key_press_claims(&self, window: WindowId) -> Result<Option<KeyPressClaims>> {
        match self.conn.get_window_attributes(window)?.reply() {
            Ok(attrs) => {
                let key_press = u32::from(EventMask::KEY_PRESS);
                Ok(Some(KeyPressClaims {
                    selected: u32::from(attrs.all_event_masks) & key_press != 0,
                    not_propagated: u32::from(attrs.do_not_propagate_mask) & key_press != 0,
                }))
            }
            Err(e) => Self::vanished(window, e),
        }
    }

    fn select_input(&self, window: WindowId, interest: EventInterest) -> Result<()> {
        let mask = match interest {
            EventInterest::Substructure => EventMask::SUBSTRUCTURE_NOTIFY,
            EventInterest::SubstructureAndKeys => {
                EventMask::SUBSTRUCTURE_NOTIFY | EventMask::KEY_PRESS
            }
        };

        // Ошибки для исчезнувших окон придут позже как события и будут проигнорированы
        self.conn
            .change_window_attributes(window, &ChangeWindowAttributesAux::new().event_mask(mask))?;
        Ok(())
    }

    fn poll_event(&self) -> Result<Option<DisplayEvent>> {
        let event = match self.conn.poll_for_event()? {
            Some(event) => event,
            None => return Ok(None),
        };

        let event = match event {
            Event::CreateNotify(e) => DisplayEvent::Created { window: e.window },
            Event::KeyPress(e) => key_press_from(e.response_type, e.event),
            Event::Error(e) => {
                trace_if_enabled!("Игнорируем ошибку X-сервера: {:?}", e.error_kind);
                DisplayEvent::Other
            }
            _ => DisplayEvent::Other,
        };

        Ok(Some(event))
    }

    fn intern_atom(&self, name: &str) -> Result<Atom> {
        let atom = self.conn.intern_atom(false, name.as_bytes())?.reply()?.atom;
        debug!("Атом {} = {}", name, atom);
        Ok(atom)
    }

    fn get_integer_property(&self, window: WindowId, property: Atom) -> Result<Option<i32>> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, 2)?
            .reply()?;

        Ok(decode_integer(reply.type_, reply.format, &reply.value))
    }

    fn set_integer_property(&self, window: WindowId, property: Atom, value: i32) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            property,
            AtomEnum::INTEGER,
            &[value as u32],
        )?;
        Ok(())
    }

    fn delete_property(&self, window: WindowId, property: Atom) -> Result<()> {
        self.conn.delete_property(window, property)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }
}

/// Нажатие, присланное через SendEvent, помечается как синтетическое
fn key_press_from(response_type: u8, window: WindowId) -> DisplayEvent {
    DisplayEvent::KeyPress {
        window,
        synthetic: response_type & SEND_EVENT_BIT != 0,
    }
}

/// Первое значение свойства типа INTEGER; `None` для любого другого типа
fn decode_integer(type_: Atom, format: u8, value: &[u8]) -> Option<i32> {
    if type_ != u32::from(AtomEnum::INTEGER) {
        return None;
    }

    let bytes: [u8; 4] = value.get(..4)?.try_into().ok()?;
    match format {
        // RustConnection отдаёт format 32 в порядке байт хоста, а старые
        // сборки на C пишут format 8 с байтами int в том же порядке
        32 | 8 => Some(i32::from_ne_bytes(bytes)),
        _ => None,
    }
}

impl Drop for X11Display {
    fn drop(&mut self) {
        info!("Соединение с X-сервером закрывается");
    }
}
