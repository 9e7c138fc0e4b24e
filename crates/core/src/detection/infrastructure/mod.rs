pub mod cascade_face_localizer;
