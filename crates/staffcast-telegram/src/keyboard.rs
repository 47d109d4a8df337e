//! Keyboard builders.

use crate::types::{
    InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, ReplyKeyboardMarkup,
    ReplyKeyboardRemove, ReplyMarkup,
};

/// Build a reply keyboard from flat labels, `per_row` buttons per row.
pub fn reply_keyboard(labels: &[String], per_row: usize) -> ReplyMarkup {
    let per_row = per_row.max(1);
    let keyboard = labels
        .chunks(per_row)
        .map(|row| {
            row.iter()
                .map(|text| KeyboardButton { text: text.clone() })
                .collect()
        })
        .collect();
    ReplyMarkup::Reply(ReplyKeyboardMarkup {
        keyboard,
        resize_keyboard: true,
    })
}

/// Build an inline keyboard from rows of `(label, callback payload)` pairs.
pub fn inline_keyboard(rows: Vec<Vec<(String, String)>>) -> ReplyMarkup {
    let inline_keyboard = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|(text, callback_data)| InlineKeyboardButton {
                    text,
                    callback_data,
                })
                .collect()
        })
        .collect();
    ReplyMarkup::Inline(InlineKeyboardMarkup { inline_keyboard })
}

/// Tell the client to drop the current reply keyboard.
pub fn remove_keyboard() -> ReplyMarkup {
    ReplyMarkup::Remove(ReplyKeyboardRemove {
        remove_keyboard: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("b{i}")).collect()
    }

    #[test]
    fn reply_keyboard_chunks_rows() {
        let ReplyMarkup::Reply(markup) = reply_keyboard(&labels(5), 2) else {
            panic!("expected reply markup");
        };
        let row_lens: Vec<usize> = markup.keyboard.iter().map(|r| r.len()).collect();
        assert_eq!(row_lens, vec![2, 2, 1]);
        assert_eq!(markup.keyboard[2][0].text, "b5");
    }

    #[test]
    fn inline_keyboard_preserves_grid() {
        let ReplyMarkup::Inline(markup) = inline_keyboard(vec![
            vec![("a".into(), "1".into()), ("b".into(), "2".into())],
            vec![("c".into(), "3".into())],
        ]) else {
            panic!("expected inline markup");
        };
        assert_eq!(markup.inline_keyboard[0][1].callback_data, "2");
        assert_eq!(markup.inline_keyboard[1].len(), 1);
    }
}
