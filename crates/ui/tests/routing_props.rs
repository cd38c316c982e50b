//! Router and refresh-deadline properties.

use proptest::prelude::*;
use ui::deadline::AUDIO_REFRESH_MS;
use ui::keys::{KEY_ESCAPE, KEY_HOME, KEY_POWER};
use ui::{Route, Router, ScreenId};

fn screen() -> impl Strategy<Value = ScreenId> {
    prop::sample::select(ScreenId::LAUNCHER.to_vec())
}

proptest! {
    #[test]
    fn prop_non_global_keys_reach_current_screen(key in any::<u8>(), target in screen()) {
        prop_assume!(![KEY_POWER, KEY_HOME, KEY_ESCAPE].contains(&key));
        let mut r = Router::new();
        r.open(target, 0);
        prop_assert_eq!(r.begin(Some(key)), Route::Screen { id: target, key });
    }

    #[test]
    fn prop_audio_never_refreshes_early(delta in 0u32..120_000, now in 0u64..1_000_000, idle in 0u64..59_999) {
        let mut r = Router::new();
        r.deadline_mut().set_audio_active(true);
        r.rendered(now, delta);
        // Ticks without a consumed key never redraw inside the audio window.
        r.finish(false, now + idle);
        prop_assert!(!r.deadline().is_due(now + idle));
        prop_assert!(r.deadline().is_due(now + u64::from(delta.max(AUDIO_REFRESH_MS))));
    }

    #[test]
    fn prop_consumed_key_redraws_now(delta in 0u32..120_000, now in 0u64..1_000_000, after in 0u64..120_000) {
        let mut r = Router::new();
        r.deadline_mut().set_audio_active(true);
        r.rendered(now, delta);
        r.finish(true, now + after);
        prop_assert!(r.deadline().is_due(now + after));
    }
}
