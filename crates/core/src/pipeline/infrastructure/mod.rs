pub mod threaded_frame_sink;
