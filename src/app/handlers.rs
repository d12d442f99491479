//! キー入力ハンドラー関数。

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::path::PathBuf;

use crate::{
    input::{InputBoxState, InputCallbackId},
    shortcuts,
    worker::WorkerCmd,
};

use super::{App, request_refresh};

/// キー入力を1件処理し、終了すべきならtrueを返す。
pub async fn handle_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    // 入力ボックスが開いていれば最優先で処理する。
    if app.input_box.is_some() {
        return handle_input_box_key(app, k).await;
    }
    handle_main_key(app, k).await
}

/// Ctrl+Cかどうかを判定する。
pub fn is_ctrl_c(k: &KeyEvent) -> bool {
    k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c')
}

/// メイン画面のキー処理。
async fn handle_main_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let sc = &app.shortcuts.main;

    if shortcuts::matches_shortcut(&k, &sc.quit) {
        return Ok(true);
    } else if shortcuts::matches_shortcut(&k, &sc.upload) {
        // インポート中でも開ける。多重実行はWorker側で拒否される。
        app.input_box = Some(InputBoxState::new(
            "CSV file to import:",
            String::new(),
            InputCallbackId::UploadPath,
        ));
    } else if shortcuts::matches_shortcut(&k, &sc.refresh) {
        request_refresh(app).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.dismiss) {
        // エラー表示を消す。
        app.ui.error = None;
    } else if shortcuts::matches_shortcut(&k, &sc.down) {
        if app.ui.selected + 1 < app.products.len() {
            app.ui.selected += 1;
        }
    } else if shortcuts::matches_shortcut(&k, &sc.up) {
        app.ui.selected = app.ui.selected.saturating_sub(1);
    }

    Ok(false)
}

/// 入力ボックスのキー処理。
async fn handle_input_box_key(app: &mut App, k: KeyEvent) -> Result<bool> {
    let Some(input_state) = &mut app.input_box else {
        return Ok(false);
    };
    let sc = &app.shortcuts.input_box;

    if shortcuts::matches_shortcut(&k, &sc.confirm) {
        // 入力ボックスを閉じる前に値とコールバック種別を保存する。
        let value = input_state.value.clone();
        let callback_id = input_state.callback_id.clone();
        app.input_box = None;
        apply_input_callback(app, callback_id, value).await?;
    } else if shortcuts::matches_shortcut(&k, &sc.cancel) {
        app.input_box = None;
    } else if shortcuts::matches_shortcut(&k, &sc.backspace) {
        input_state.backspace();
    } else if shortcuts::matches_shortcut(&k, &sc.delete) {
        input_state.delete();
    } else if shortcuts::matches_shortcut(&k, &sc.left) {
        input_state.move_left();
    } else if shortcuts::matches_shortcut(&k, &sc.right) {
        input_state.move_right();
    } else if shortcuts::matches_shortcut(&k, &sc.home) {
        input_state.move_home();
    } else if shortcuts::matches_shortcut(&k, &sc.end) {
        input_state.move_end();
    } else if shortcuts::matches_shortcut(&k, &sc.clear_line) {
        input_state.clear_line();
    } else if let KeyCode::Char(c) = k.code
        && !k.modifiers.contains(KeyModifiers::CONTROL)
    {
        // コントロールキーでない場合のみ挿入する。
        input_state.insert_char(c);
    }

    Ok(false)
}

/// 入力ボックスのコールバックを適用する。
async fn apply_input_callback(
    app: &mut App,
    callback_id: InputCallbackId,
    value: String,
) -> Result<()> {
    match callback_id {
        InputCallbackId::UploadPath => {
            let path = value.trim();
            if path.is_empty() {
                return Ok(());
            }
            tracing::info!("upload requested: {path}");
            app.worker_tx
                .send(WorkerCmd::Upload(PathBuf::from(path)))
                .await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::Config, shortcuts::Shortcuts};
    use tokio::sync::mpsc;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::empty())
    }

    #[tokio::test]
    async fn test_typed_path_is_sent_as_upload() {
        let (tx_cmd, mut rx_cmd) = mpsc::channel(8);
        let (_tx_ev, rx_ev) = mpsc::channel(8);
        let mut app = App::new(Config::default(), Shortcuts::default(), tx_cmd, rx_ev);

        handle_key(&mut app, key('u')).await.unwrap();
        assert!(app.input_box.is_some());
        for c in " a.csv".chars() {
            handle_key(&mut app, key(c)).await.unwrap();
        }
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::empty());
        assert!(!handle_key(&mut app, enter).await.unwrap());

        assert!(app.input_box.is_none());
        match rx_cmd.try_recv() {
            Ok(WorkerCmd::Upload(p)) => assert_eq!(p, PathBuf::from("a.csv")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_quit_key_is_ignored_while_typing() {
        let (tx_cmd, _rx_cmd) = mpsc::channel(8);
        let (_tx_ev, rx_ev) = mpsc::channel(8);
        let mut app = App::new(Config::default(), Shortcuts::default(), tx_cmd, rx_ev);

        handle_key(&mut app, key('u')).await.unwrap();
        assert!(!handle_key(&mut app, key('q')).await.unwrap());
        assert_eq!(app.input_box.as_ref().unwrap().value, "q");

        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::empty());
        handle_key(&mut app, esc).await.unwrap();
        assert!(handle_key(&mut app, key('q')).await.unwrap());
    }
}
