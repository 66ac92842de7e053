pub mod shared {
    pub mod constants;
    pub mod detection;
    pub mod frame;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod person_detector;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod image_writer;
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

pub mod recording {
    pub mod domain {
        pub mod clip_recorder;
    }
}

pub mod notification {
    pub mod domain {
        pub mod notification_sink;
    }
    pub mod infrastructure;
}

pub mod presence {
    pub mod domain {
        pub mod presence_config;
        pub mod presence_state;
    }
    pub mod presence_tracker;
}

pub mod session {
    pub mod domain {
        pub mod control_command;
        pub mod event_log;
    }
    pub mod infrastructure;
    pub mod settings;
}

pub mod pipeline {
    pub mod frame_scheduler;
    pub mod monitor_session_use_case;
    pub mod session_stats;
}
