pub mod notes;

// 重新导出常用类型，方便外部使用
pub use notes::{
    client::{ClientConfig, LeetNoteClient},
    error::NotesError,
    page::{NoteForm, PageContext},
    service::SaveOutcome,
};
