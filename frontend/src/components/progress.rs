use leptos::*;

/// CSS width of the filled part of the bar.
///
/// Values outside [0, 100] are passed through unchanged.
pub fn bar_width(percentage: f64) -> String {
    format!("{}%", percentage)
}

/// Label next to the bar: the truncated percentage.
pub fn progress_label(percentage: f64) -> String {
    format!("{} %", percentage.trunc() as i64)
}

#[component]
pub fn ProgressIndicator(#[prop(into)] percentage: MaybeSignal<f64>) -> impl IntoView {
    view! {
        <div class="progress-indicator">
            <div class="progress-bar">
                <span
                    class="progress-fill"
                    style=move || format!("display: inline-block; width: {};", bar_width(percentage.get()))
                ></span>
            </div>
            <span class="progress-label">{move || progress_label(percentage.get())}</span>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_truncates() {
        assert_eq!(progress_label(0.0), "0 %");
        assert_eq!(progress_label(42.9), "42 %");
        assert_eq!(progress_label(100.0), "100 %");
    }

    #[test]
    fn test_width_is_not_clamped() {
        assert_eq!(bar_width(33.5), "33.5%");
        assert_eq!(bar_width(100.0), "100%");
        assert_eq!(bar_width(120.0), "120%");
        assert_eq!(bar_width(-5.0), "-5%");
    }
}
